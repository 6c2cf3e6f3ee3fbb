//! # cbgm-kernel
//!
//! Deterministic computational core for the Coherence-Based Genealogical
//! Method (CBGM) of textual criticism.
//!
//! Given a parsed collation — witnesses attesting readings across many
//! variation units, each unit carrying an editor-supplied local stemma of
//! reading priority — the kernel answers one family of questions:
//!
//! > Which witnesses are genealogically prior to which, how does text flow
//! > between them at each passage, and what is the minimal set of ancestors
//! > that explains each witness?
//!
//! ## Pipeline
//!
//! ```text
//! CollationUnit* → Apparatus → Witness precomputation → potential ancestors
//!                     │              (roaring bitmaps)        │
//!                     │                                       ├─ TextualFlow (per unit)
//!                     │                                       ├─ SetCoverSolver → substemma
//!                     └─ LocalStemma closures                 └─ GlobalStemma
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Witnesses iterate in `list_wit` order, units in index order.
//! - Potential-ancestor ties resolve by exact integer ratio comparison,
//!   then raw agreement count, then canonical witness order.
//! - Equal-cost substemma optima resolve to the earliest-rank ancestor set.
//! - Same apparatus + same options → byte-identical graph and table output.
//!
//! The kernel performs no I/O beyond writing diagrams and tables to
//! caller-supplied sinks, and holds no global state; all configuration
//! threads through [`AnalysisOptions`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apparatus;
pub mod canonical;
pub mod config;
pub mod dot;
pub mod error;
pub mod global_stemma;
pub mod local_stemma;
pub mod relatives;
pub mod set_cover;
pub mod textual_flow;
pub mod types;
pub mod variation_unit;
pub mod witness;

// Re-exports
pub use apparatus::Apparatus;
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use config::AnalysisOptions;
pub use error::{CbgmError, UncoverableSubstemma};
pub use global_stemma::GlobalStemma;
pub use local_stemma::{LocalStemma, StemmaEdge};
pub use relatives::{find_relatives, write_relatives_table, RelativesReport};
pub use set_cover::{SetCoverResult, SetCoverRow, SetCoverSolution, SetCoverSolver};
pub use textual_flow::{FlowEdge, FlowVertex, TextualFlow};
pub use types::{CollationReading, CollationUnit, Direction, FlowType, ReadingId, WitnessId};
pub use variation_unit::VariationUnit;
pub use witness::{build_witnesses, Witness, WitnessComparison};

/// Schema version for exported artifacts.
/// Increment on breaking changes to any exported shape.
pub const CBGM_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
