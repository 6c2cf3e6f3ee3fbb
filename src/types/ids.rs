//! Identifier types for readings and witnesses.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a reading, unique within its variation unit.
///
/// Wraps an opaque string and implements `Ord` for deterministic
/// tie-breaking; analysis order always follows the unit's reading list,
/// never this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(String);

impl ReadingId {
    /// Create a new ReadingId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReadingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReadingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ReadingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of a witness, unique across the apparatus.
///
/// Same shape as [`ReadingId`]: opaque string, canonical `Ord` used only
/// to break ties after the `list_wit` order has been exhausted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WitnessId(String);

impl WitnessId {
    /// Create a new WitnessId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WitnessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WitnessId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WitnessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for WitnessId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
