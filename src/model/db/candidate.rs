use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{api::candidate::CandidateSpec, common::CandidateStatus, mongodb::Id};

/// Core candidacy data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCandidate {
    /// The election stood in.
    pub election_id: Id,
    /// The user standing.
    pub user_id: Id,
    /// Party the candidate stands for.
    pub party_name: String,
    /// Ballot symbol.
    pub symbol: String,
    /// Free-text manifesto; may be empty.
    pub manifesto: String,
    /// Candidate's age in years.
    pub age: u32,
    /// Qualification statement.
    pub qualification: String,
    /// Denormalised running vote count.
    pub total_votes: u64,
    /// Lifecycle status.
    pub status: CandidateStatus,
    /// Reason recorded on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Registration timestamp.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub registered_at: DateTime<Utc>,
}

impl NewCandidate {
    /// A Pending candidacy for the given user, built from a registration
    /// spec.
    pub fn for_registration(election_id: Id, user_id: Id, spec: CandidateSpec) -> Self {
        Self {
            election_id,
            user_id,
            party_name: spec.party_name,
            symbol: spec.symbol,
            manifesto: spec.manifesto.unwrap_or_default(),
            age: spec.age,
            qualification: spec.qualification,
            total_votes: 0,
            status: CandidateStatus::Pending,
            rejection_reason: None,
            registered_at: Utc::now(),
        }
    }

    /// Every violated field invariant, in a fixed order, phrased for end
    /// users. Callers get the whole list, not just the first failure.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.party_name.trim().is_empty() {
            errors.push("Party name is required".to_string());
        }
        if self.symbol.trim().is_empty() {
            errors.push("Party symbol is required".to_string());
        }
        if !(1..150).contains(&self.age) {
            errors.push("Valid age is required (between 1 and 149)".to_string());
        }
        if self.qualification.trim().is_empty() {
            errors.push("Qualification is required".to_string());
        }
        errors
    }

    /// True iff every field invariant holds.
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.status == CandidateStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == CandidateStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == CandidateStatus::Rejected
    }
}

/// A candidacy from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: NewCandidate,
}

impl Deref for Candidate {
    type Target = NewCandidate;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl NewCandidate {
        /// A valid Pending candidacy.
        pub fn example() -> Self {
            Self {
                election_id: Id::new(),
                user_id: Id::new(),
                party_name: "Allotment Party".to_string(),
                symbol: "Spade".to_string(),
                manifesto: "More allotments for everyone.".to_string(),
                age: 42,
                qualification: "Parish councillor".to_string(),
                total_votes: 0,
                status: CandidateStatus::Pending,
                rejection_reason: None,
                registered_at: Utc::now(),
            }
        }
    }

    impl Candidate {
        /// An Approved candidacy with the given vote total.
        pub fn approved_example(election_id: Id, total_votes: u64) -> Self {
            let mut candidate = NewCandidate::example();
            candidate.election_id = election_id;
            candidate.status = CandidateStatus::Approved;
            candidate.total_votes = total_votes;
            Self {
                id: Id::new(),
                candidate,
            }
        }
    }

    #[test]
    fn valid_iff_no_errors() {
        let candidate = NewCandidate::example();
        assert!(candidate.is_valid());
        assert!(candidate.validation_errors().is_empty());

        let mut invalid = NewCandidate::example();
        invalid.symbol = String::new();
        assert!(!invalid.is_valid());
        assert!(!invalid.validation_errors().is_empty());
    }

    #[test]
    fn reports_every_violation_in_order() {
        let mut candidate = NewCandidate::example();
        candidate.party_name = "  ".to_string();
        candidate.symbol = String::new();
        candidate.age = 150;
        candidate.qualification = String::new();
        assert_eq!(
            candidate.validation_errors(),
            [
                "Party name is required",
                "Party symbol is required",
                "Valid age is required (between 1 and 149)",
                "Qualification is required",
            ]
        );
    }

    #[test]
    fn age_bounds_are_exclusive() {
        let mut candidate = NewCandidate::example();
        candidate.age = 0;
        assert!(!candidate.is_valid());
        candidate.age = 1;
        assert!(candidate.is_valid());
        candidate.age = 149;
        assert!(candidate.is_valid());
        candidate.age = 150;
        assert!(!candidate.is_valid());
    }

    #[test]
    fn empty_manifesto_is_allowed() {
        let mut candidate = NewCandidate::example();
        candidate.manifesto = String::new();
        assert!(candidate.is_valid());
    }
}
