//! Core types for the CBGM kernel.

pub mod collation;
pub mod flow;
pub mod ids;

pub use collation::{CollationReading, CollationUnit};
pub use flow::{Direction, FlowType};
pub use ids::{ReadingId, WitnessId};

/// Reading types eligible for sub-variant treatment. Types outside the
/// configured distinct set are folded into their canonical parents.
pub const SUBVARIANT_READING_TYPES: [&str; 3] = ["split", "orthographic", "defective"];

/// Reading type tag marking ambiguous attestations.
pub const AMBIGUOUS_READING_TYPE: &str = "ambiguous";
