use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Complaint workflow stages in their canonical order.
///
/// Every index lookup (transition validation, `currentStep`, comment
/// `stepOrder`) goes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Received,
    Review,
    Investigation,
    Action,
    Closed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Received,
        Stage::Review,
        Stage::Investigation,
        Stage::Action,
        Stage::Closed,
    ];

    /// Zero-based position in [`Stage::ALL`].
    pub fn index(self) -> usize {
        match self {
            Stage::Received => 0,
            Stage::Review => 1,
            Stage::Investigation => 2,
            Stage::Action => 3,
            Stage::Closed => 4,
        }
    }

    /// One-based step number, used for `currentStep` and comment `stepOrder`.
    pub fn step_number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    /// The only stage a complaint may move to from `self`.
    pub fn next(self) -> Option<Stage> {
        Stage::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "RECEIVED",
            Stage::Review => "REVIEW",
            Stage::Investigation => "INVESTIGATION",
            Stage::Action => "ACTION",
            Stage::Closed => "CLOSED",
        }
    }

    /// Step order for a stored comment tag. Missing or unrecognised tags
    /// sort as RECEIVED.
    pub fn order_of(tag: Option<&str>) -> u8 {
        tag.and_then(|t| t.parse::<Stage>().ok())
            .unwrap_or(Stage::Received)
            .step_number()
    }

    /// Human readable path, e.g. for error messages.
    pub fn workflow_path() -> String {
        Stage::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown workflow stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    /// Only the canonical uppercase names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_is_consistent() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(stage.step_number() as usize, i + 1);
            assert_eq!(Stage::from_index(i), Some(*stage));
        }
        assert_eq!(Stage::from_index(5), None);
    }

    #[test]
    fn test_next_is_linear_and_closed_is_terminal() {
        assert_eq!(Stage::Received.next(), Some(Stage::Review));
        assert_eq!(Stage::Review.next(), Some(Stage::Investigation));
        assert_eq!(Stage::Investigation.next(), Some(Stage::Action));
        assert_eq!(Stage::Action.next(), Some(Stage::Closed));
        assert_eq!(Stage::Closed.next(), None);
        assert!(Stage::Closed.is_terminal());
        assert!(!Stage::Action.is_terminal());
    }

    #[test]
    fn test_parse_accepts_only_canonical_names() {
        assert_eq!("REVIEW".parse::<Stage>(), Ok(Stage::Review));
        assert_eq!("INVESTIGATION".parse::<Stage>(), Ok(Stage::Investigation));
        assert!("review".parse::<Stage>().is_err());
        assert!("Review".parse::<Stage>().is_err());
        assert!(" INVESTIGATION ".parse::<Stage>().is_err());
        assert!("ESCALATED".parse::<Stage>().is_err());
        assert!("".parse::<Stage>().is_err());
    }

    #[test]
    fn test_order_of_falls_back_to_received() {
        assert_eq!(Stage::order_of(Some("ACTION")), 4);
        assert_eq!(Stage::order_of(Some("CLOSED")), 5);
        assert_eq!(Stage::order_of(Some("bogus")), 1);
        assert_eq!(Stage::order_of(Some("action")), 1);
        assert_eq!(Stage::order_of(None), 1);
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Stage::Investigation).unwrap();
        assert_eq!(json, "\"INVESTIGATION\"");
        let back: Stage = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(back, Stage::Closed);
    }
}
