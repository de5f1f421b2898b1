use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the candidacy lifecycle.
///
/// A candidacy starts Pending and is decided exactly once: Approved and
/// Rejected are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    /// Registered, awaiting a decision by the election's admin.
    Pending,
    /// Accepted onto the ballot.
    Approved,
    /// Turned down; excluded from the active candidate count.
    Rejected,
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_as_screaming_snake_case() {
        assert_eq!(
            Bson::from(CandidateStatus::Pending),
            Bson::String("PENDING".to_string())
        );
        assert_eq!(
            Bson::from(CandidateStatus::Approved),
            Bson::String("APPROVED".to_string())
        );
        assert_eq!(
            Bson::from(CandidateStatus::Rejected),
            Bson::String("REJECTED".to_string())
        );
    }
}
