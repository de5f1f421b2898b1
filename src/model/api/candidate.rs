use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::CandidateStatus,
    db::{
        candidate::{Candidate, NewCandidate},
        user::User,
    },
    mongodb::Id,
};

/// Payload for registering a candidacy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub party_name: String,
    pub symbol: String,
    #[serde(default)]
    pub manifesto: Option<String>,
    pub age: u32,
    pub qualification: String,
}

/// Partial update of a Pending candidacy.
///
/// Absent fields keep their stored values; the merged whole is re-validated
/// before commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifesto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
}

impl CandidatePatch {
    /// Merge this patch over the stored candidacy. Identity, status, vote
    /// count, and registration time are never patchable.
    pub fn apply_to(&self, stored: &NewCandidate) -> NewCandidate {
        NewCandidate {
            party_name: self
                .party_name
                .clone()
                .unwrap_or_else(|| stored.party_name.clone()),
            symbol: self.symbol.clone().unwrap_or_else(|| stored.symbol.clone()),
            manifesto: self
                .manifesto
                .clone()
                .unwrap_or_else(|| stored.manifesto.clone()),
            age: self.age.unwrap_or(stored.age),
            qualification: self
                .qualification
                .clone()
                .unwrap_or_else(|| stored.qualification.clone()),
            ..stored.clone()
        }
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.party_name.is_none()
            && self.symbol.is_none()
            && self.manifesto.is_none()
            && self.age.is_none()
            && self.qualification.is_none()
    }
}

/// Linked user details embedded in the full candidate view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateUser {
    pub user_id: Id,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

/// Public subset of the linked user: display details only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicCandidateUser {
    pub fullname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

/// Full candidate view, for the owner and the election's admins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub candidate_id: Id,
    pub election_id: Id,
    pub user_id: Id,
    pub party_name: String,
    pub symbol: String,
    pub manifesto: String,
    pub age: u32,
    pub qualification: String,
    pub total_votes: u64,
    pub status: CandidateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CandidateUser>,
}

impl CandidateView {
    /// Build the full view, embedding the linked user when available.
    pub fn new(candidate: Candidate, user: Option<User>) -> Self {
        let Candidate { id, candidate } = candidate;
        Self {
            candidate_id: id,
            election_id: candidate.election_id,
            user_id: candidate.user_id,
            party_name: candidate.party_name,
            symbol: candidate.symbol,
            manifesto: candidate.manifesto,
            age: candidate.age,
            qualification: candidate.qualification,
            total_votes: candidate.total_votes,
            status: candidate.status,
            rejection_reason: candidate.rejection_reason,
            registered_at: candidate.registered_at,
            user: user.map(|user| CandidateUser {
                user_id: user.id,
                fullname: user.fullname,
                email: user.email,
                profile_photo: user.profile_photo,
            }),
        }
    }
}

/// Public candidate view: the only shape handed to unauthenticated or
/// third-party readers. Omits the owning user's id and email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicCandidateView {
    pub candidate_id: Id,
    pub election_id: Id,
    pub party_name: String,
    pub symbol: String,
    pub manifesto: String,
    pub age: u32,
    pub qualification: String,
    pub total_votes: u64,
    pub status: CandidateStatus,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicCandidateUser>,
}

impl PublicCandidateView {
    pub fn new(candidate: Candidate, user: Option<User>) -> Self {
        let Candidate { id, candidate } = candidate;
        Self {
            candidate_id: id,
            election_id: candidate.election_id,
            party_name: candidate.party_name,
            symbol: candidate.symbol,
            manifesto: candidate.manifesto,
            age: candidate.age,
            qualification: candidate.qualification,
            total_votes: candidate.total_votes,
            status: candidate.status,
            registered_at: candidate.registered_at,
            user: user.map(|user| PublicCandidateUser {
                fullname: user.fullname,
                profile_photo: user.profile_photo,
            }),
        }
    }
}
