use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the election lifecycle.
///
/// Elections are driven through these states elsewhere; the candidacy and
/// results engine only gates its operations on them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionState {
    /// Under construction, not yet open to voters.
    Draft,
    /// Open: registration and voting in progress.
    Active,
    /// Voting closed; results may be generated.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl ElectionState {
    /// Whether new candidacies may still be registered.
    pub fn accepts_candidates(self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Lower-case name for user-facing messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<ElectionState> for Bson {
    fn from(state: ElectionState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_gated_on_state() {
        assert!(ElectionState::Draft.accepts_candidates());
        assert!(ElectionState::Active.accepts_candidates());
        assert!(!ElectionState::Completed.accepts_candidates());
        assert!(!ElectionState::Cancelled.accepts_candidates());
    }
}
