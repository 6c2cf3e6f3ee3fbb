//! Flow classification types for textual-flow edges and comparison rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a textual-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlowType {
    /// No flow established (vertex-only entries).
    None,
    /// Descendant agrees with its ancestor in a single reading.
    Equal,
    /// Descendant agrees with its ancestor but attests multiple readings.
    Ambiguous,
    /// Descendant is extant but no ancestor within the connectivity bound
    /// agrees with it; the reading changed along this edge.
    Change,
    /// Descendant is lacunose; flow connects to its first extant ancestor.
    Loss,
}

impl FlowType {
    /// Parse a flow type from its display form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "equal" => Some(Self::Equal),
            "ambiguous" => Some(Self::Ambiguous),
            "change" => Some(Self::Change),
            "loss" => Some(Self::Loss),
            _ => None,
        }
    }
}

impl Default for FlowType {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Equal => write!(f, "equal"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Change => write!(f, "change"),
            Self::Loss => write!(f, "loss"),
        }
    }
}

/// Genealogical direction of a secondary witness relative to a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The secondary witness explains the subject more often than the
    /// reverse (ancestor candidate).
    Ancestor,
    /// The subject explains the secondary witness more often (descendant).
    Descendant,
    /// Neither explains the other more often.
    Equal,
}

impl Direction {
    /// Derive a direction from prior/posterior counts of a comparison.
    pub fn from_counts(prior: u64, posterior: u64) -> Self {
        match posterior.cmp(&prior) {
            std::cmp::Ordering::Greater => Self::Ancestor,
            std::cmp::Ordering::Less => Self::Descendant,
            std::cmp::Ordering::Equal => Self::Equal,
        }
    }

    /// Table glyph: `>` ancestor, `<` descendant, `=` equal priority.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Ancestor => ">",
            Self::Descendant => "<",
            Self::Equal => "=",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_type_roundtrip() {
        for ty in [
            FlowType::None,
            FlowType::Equal,
            FlowType::Ambiguous,
            FlowType::Change,
            FlowType::Loss,
        ] {
            assert_eq!(FlowType::from_str(&ty.to_string()), Some(ty));
        }
        assert_eq!(FlowType::from_str("bogus"), None);
    }

    #[test]
    fn test_direction_from_counts() {
        assert_eq!(Direction::from_counts(0, 3), Direction::Ancestor);
        assert_eq!(Direction::from_counts(3, 0), Direction::Descendant);
        assert_eq!(Direction::from_counts(2, 2), Direction::Equal);
    }
}
