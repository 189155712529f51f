//! Canonical deal stages and the classifier that maps raw labels onto them.
//!
//! Stored data carries freeform stage labels from several eras of the product
//! (English and Turkish UI labels, old enum spellings). Everything past the
//! classifier works with [`Stage`] only.

mod classifier;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use classifier::{classify_stage, STAGE_SYNONYMS};

/// Closed set of pipeline stages a deal can be in.
///
/// Declaration order is board column order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Lead,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl Stage {
    /// All stages in column order.
    pub const ALL: [Stage; 5] = [
        Stage::Lead,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::Won,
        Stage::Lost,
    ];

    /// Canonical identifier, as stored and as used for column drop tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lead => "lead",
            Stage::Proposal => "proposal",
            Stage::Negotiation => "negotiation",
            Stage::Won => "won",
            Stage::Lost => "lost",
        }
    }

    /// Whether the deal is closed (won or lost).
    pub fn is_closed(&self) -> bool {
        matches!(self, Stage::Won | Stage::Lost)
    }

    /// Parses an exact canonical identifier. Use [`classify_stage`] for raw labels.
    pub fn from_canonical(id: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.as_str() == id)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing never fails: unknown labels classify to the fallback stage.
impl FromStr for Stage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(classify_stage(Some(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_column_order() {
        let ids: Vec<&str> = Stage::ALL.iter().map(Stage::as_str).collect();
        assert_eq!(ids, ["lead", "proposal", "negotiation", "won", "lost"]);
    }

    #[test]
    fn test_from_canonical_rejects_synonyms() {
        assert_eq!(Stage::from_canonical("won"), Some(Stage::Won));
        assert_eq!(Stage::from_canonical("closed_won"), None);
        assert_eq!(Stage::from_canonical("Won"), None);
    }

    #[test]
    fn test_from_str_classifies() {
        let stage: Stage = "Kazanıldı".parse().unwrap();
        assert_eq!(stage, Stage::Won);
    }

    #[test]
    fn test_serde_uses_canonical_ids() {
        let json = serde_json::to_string(&Stage::Negotiation).unwrap();
        assert_eq!(json, "\"negotiation\"");
        let back: Stage = serde_json::from_str("\"lost\"").unwrap();
        assert_eq!(back, Stage::Lost);
    }

    #[test]
    fn test_is_closed() {
        assert!(Stage::Won.is_closed());
        assert!(Stage::Lost.is_closed());
        assert!(!Stage::Proposal.is_closed());
    }
}
