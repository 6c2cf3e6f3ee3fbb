//! Error kinds for the CBGM kernel.

use crate::types::WitnessId;
use std::fmt;

/// Error type for kernel operations.
///
/// Every variant is fatal to the current request; the one non-fatal
/// condition the kernel can detect, an uncoverable substemma, is reported
/// as an [`UncoverableSubstemma`] diagnostic next to the results instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CbgmError {
    /// The parsed collation violates a structural constraint.
    #[error("malformed collation: {0}")]
    InputMalformed(String),
    /// A passage or witness selector does not resolve.
    #[error("unknown selector: {0}")]
    UnknownSelector(String),
    /// The requested primary witness falls below the extancy threshold.
    #[error("witness {witness} is extant at {extant} units, below the threshold of {threshold}")]
    ThresholdExcludesSubject {
        /// The excluded witness.
        witness: WitnessId,
        /// Units at which the witness is extant.
        extant: usize,
        /// The configured minimum.
        threshold: usize,
    },
    /// A closure, bitmap, or rank invariant has been violated.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Non-fatal diagnostic: a witness has extant units that no potential
/// ancestor explains, so its substemma is a partial cover and the global
/// stemma is not fully constructible through it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UncoverableSubstemma {
    /// The witness whose extancy could not be covered.
    pub witness: WitnessId,
    /// Variation-unit indices left uncovered.
    pub uncovered: Vec<u32>,
}

impl fmt::Display for UncoverableSubstemma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "witness {} has no explaining ancestor at units [{}]",
            self.witness,
            self.uncovered
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
