//! The candidacy state machine: registration, approval, rejection, update,
//! withdrawal, and the read operations over candidacies.
//!
//! Every mutation keeps the owning election's `total_candidates` counter in
//! step with the set of Pending and Approved rows, using the storage
//! engine's atomic primitives rather than read-modify-write.

use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, Bson},
    options::FindOptions,
    Client, Database,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    api::candidate::{CandidatePatch, CandidateSpec, CandidateView, PublicCandidateView},
    common::CandidateStatus,
    db::{
        admin::AdminRelation,
        candidate::{Candidate, NewCandidate},
        election::Election,
        user::User,
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

/// Counts of an election's candidacies by status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateStats {
    pub total: u64,
    pub approved: u64,
    pub pending: u64,
    pub rejected: u64,
}

/// Orchestrates the candidacy lifecycle.
///
/// Holds its storage handles explicitly; construct one per database with
/// [`CandidacyManager::new`].
pub struct CandidacyManager {
    client: Client,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    elections: Coll<Election>,
    admins: Coll<AdminRelation>,
    users: Coll<User>,
}

impl CandidacyManager {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            candidates: Coll::from_db(db),
            new_candidates: Coll::from_db(db),
            elections: Coll::from_db(db),
            admins: Coll::from_db(db),
            users: Coll::from_db(db),
        }
    }

    /// Register `requester` as a candidate in the given election.
    ///
    /// The candidacy starts Pending; approval is always a separate admin
    /// action. The row insert and the election's counter increment land in
    /// one transaction.
    pub async fn register(
        &self,
        election_id: Id,
        spec: CandidateSpec,
        requester: Id,
    ) -> Result<CandidateView> {
        let candidate = NewCandidate::for_registration(election_id, requester, spec);
        let errors = candidate.validation_errors();
        if !errors.is_empty() {
            return Err(Error::InvalidInput(errors));
        }

        // One candidacy per user per election.
        let duplicate_filter = doc! { "election_id": election_id, "user_id": requester };
        if self
            .candidates
            .find_one(duplicate_filter, None)
            .await?
            .is_some()
        {
            return Err(Error::conflict(
                "User is already registered as a candidate for this election",
            ));
        }

        let election = self
            .elections
            .find_one(election_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        ensure_registrable(&election)?;

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let insert = self
            .new_candidates
            .insert_one_with_session(&candidate, None, &mut session)
            .await;
        let new_id: Id = match insert {
            Ok(result) => result
                .inserted_id
                .as_object_id()
                .unwrap() // Valid because the ID comes directly from the DB
                .into(),
            Err(err) if is_duplicate_key_error(&err) => {
                // Lost a registration race; the unique index caught it.
                session.abort_transaction().await?;
                return Err(Error::conflict(
                    "User is already registered as a candidate for this election",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let increment = doc! { "$inc": { "total_candidates": 1 } };
        self.elections
            .update_one_with_session(election_id.as_doc(), increment, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        info!("Registered candidate {new_id} for election {election_id}");

        self.view(Candidate {
            id: new_id,
            candidate,
        })
        .await
    }

    /// Approve a Pending candidacy. Only the election's admin may do this.
    pub async fn approve(&self, candidate_id: Id, requester: Id) -> Result<CandidateView> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        self.ensure_election_admin(candidate.election_id, requester)
            .await?;

        // Conditional on the current status: Approved and Rejected are
        // terminal, so a candidacy is decided exactly once even when two
        // admins race.
        let filter = doc! { "_id": candidate_id, "status": CandidateStatus::Pending };
        let update = doc! { "$set": { "status": CandidateStatus::Approved } };
        let result = self.candidates.update_one(filter, update, None).await?;
        if result.modified_count != 1 {
            return Err(Error::conflict(format!(
                "Candidacy {candidate_id} has already been decided"
            )));
        }

        info!("Approved candidate {candidate_id} for election {}", candidate.election_id);
        let candidate = self.candidate_by_id(candidate_id).await?;
        self.view(candidate).await
    }

    /// Reject a Pending candidacy, recording the reason. Only the
    /// election's admin may do this. Rejected candidacies leave the active
    /// count, so the status flip and the counter decrement land in one
    /// transaction.
    pub async fn reject(
        &self,
        candidate_id: Id,
        requester: Id,
        reason: impl Into<Option<String>>,
    ) -> Result<CandidateView> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        self.ensure_election_admin(candidate.election_id, requester)
            .await?;

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! { "_id": candidate_id, "status": CandidateStatus::Pending };
        let mut set = doc! { "status": CandidateStatus::Rejected };
        if let Some(reason) = reason.into() {
            set.insert("rejection_reason", reason);
        }
        let result = self
            .candidates
            .update_one_with_session(filter, doc! { "$set": set }, None, &mut session)
            .await?;
        if result.modified_count != 1 {
            session.abort_transaction().await?;
            return Err(Error::conflict(format!(
                "Candidacy {candidate_id} has already been decided"
            )));
        }

        let decrement = doc! { "$inc": { "total_candidates": -1 } };
        self.elections
            .update_one_with_session(
                candidate.election_id.as_doc(),
                decrement,
                None,
                &mut session,
            )
            .await?;

        session.commit_transaction().await?;
        info!("Rejected candidate {candidate_id} for election {}", candidate.election_id);

        let candidate = self.candidate_by_id(candidate_id).await?;
        self.view(candidate).await
    }

    /// Update a Pending candidacy's profile fields. Owner only; the merged
    /// result is validated as a whole before commit.
    pub async fn update(
        &self,
        candidate_id: Id,
        patch: CandidatePatch,
        requester: Id,
    ) -> Result<CandidateView> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        if candidate.user_id != requester {
            return Err(Error::unauthorized("Can only update your own candidacy"));
        }
        if !candidate.is_pending() {
            return Err(Error::conflict(
                "Can only update pending candidate registrations",
            ));
        }

        let merged = patch.apply_to(&candidate.candidate);
        let errors = merged.validation_errors();
        if !errors.is_empty() {
            return Err(Error::InvalidInput(errors));
        }

        // Guarded on status so a concurrent decision can't be overwritten.
        let filter = doc! { "_id": candidate_id, "status": CandidateStatus::Pending };
        let update = doc! {
            "$set": {
                "party_name": &merged.party_name,
                "symbol": &merged.symbol,
                "manifesto": &merged.manifesto,
                "age": i64::from(merged.age),
                "qualification": &merged.qualification,
            }
        };
        let result = self.candidates.update_one(filter, update, None).await?;
        if result.matched_count != 1 {
            return Err(Error::conflict(
                "Can only update pending candidate registrations",
            ));
        }

        let candidate = self.candidate_by_id(candidate_id).await?;
        self.view(candidate).await
    }

    /// Withdraw a Pending candidacy. Owner only; the row disappears and
    /// the election's counter drops, in one transaction.
    pub async fn delete(&self, candidate_id: Id, requester: Id) -> Result<()> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        if candidate.user_id != requester {
            return Err(Error::unauthorized("Can only delete your own candidacy"));
        }
        if !candidate.is_pending() {
            return Err(Error::conflict(
                "Can only delete pending candidate registrations",
            ));
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! { "_id": candidate_id, "status": CandidateStatus::Pending };
        let result = self
            .candidates
            .delete_one_with_session(filter, None, &mut session)
            .await?;
        if result.deleted_count != 1 {
            session.abort_transaction().await?;
            return Err(Error::conflict(
                "Can only delete pending candidate registrations",
            ));
        }

        let decrement = doc! { "$inc": { "total_candidates": -1 } };
        self.elections
            .update_one_with_session(
                candidate.election_id.as_doc(),
                decrement,
                None,
                &mut session,
            )
            .await?;

        session.commit_transaction().await?;
        info!(
            "Withdrew candidate {candidate_id} from election {}",
            candidate.election_id
        );
        Ok(())
    }

    /// All candidacies in an election, optionally filtered by status,
    /// newest-first.
    pub async fn by_election(
        &self,
        election_id: Id,
        status: Option<CandidateStatus>,
    ) -> Result<Vec<CandidateView>> {
        let mut filter = doc! { "election_id": election_id };
        if let Some(status) = status {
            filter.insert("status", status);
        }
        let options = FindOptions::builder()
            .sort(doc! { "registered_at": -1 })
            .build();
        let candidates: Vec<Candidate> = self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        self.views(candidates).await
    }

    /// Approved candidates ranked by vote total: descending votes, ties
    /// going to the earliest registration. This fetch order is the display
    /// ranking.
    pub async fn approved(&self, election_id: Id) -> Result<Vec<PublicCandidateView>> {
        let filter = doc! { "election_id": election_id, "status": CandidateStatus::Approved };
        let options = FindOptions::builder()
            .sort(doc! { "total_votes": -1, "registered_at": 1 })
            .build();
        let candidates: Vec<Candidate> = self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?;

        let mut views = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let user = self
                .users
                .find_one(candidate.user_id.as_doc(), None)
                .await?;
            views.push(PublicCandidateView::new(candidate, user));
        }
        Ok(views)
    }

    /// Pending candidacies awaiting decision. Admin only.
    pub async fn pending(&self, election_id: Id, requester: Id) -> Result<Vec<CandidateView>> {
        self.ensure_election_admin(election_id, requester).await?;
        self.by_election(election_id, Some(CandidateStatus::Pending))
            .await
    }

    /// A user's candidacies across elections, newest-first.
    pub async fn by_user(&self, user_id: Id) -> Result<Vec<CandidateView>> {
        let options = FindOptions::builder()
            .sort(doc! { "registered_at": -1 })
            .build();
        let candidates: Vec<Candidate> = self
            .candidates
            .find(doc! { "user_id": user_id }, options)
            .await?
            .try_collect()
            .await?;
        self.views(candidates).await
    }

    /// One candidacy, with the linked user attached.
    pub async fn by_id(&self, candidate_id: Id) -> Result<CandidateView> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        self.view(candidate).await
    }

    /// The public profile of an Approved candidate. Any other status is
    /// reported as unavailable.
    pub async fn public_profile(&self, candidate_id: Id) -> Result<PublicCandidateView> {
        let candidate = self.candidate_by_id(candidate_id).await?;
        if !candidate.is_approved() {
            return Err(Error::not_found(format!(
                "Candidate profile {candidate_id} is not available"
            )));
        }
        let user = self
            .users
            .find_one(candidate.user_id.as_doc(), None)
            .await?;
        Ok(PublicCandidateView::new(candidate, user))
    }

    /// Status-count aggregate for dashboarding.
    pub async fn stats(&self, election_id: Id) -> Result<CandidateStats> {
        let pipeline = vec![
            doc! { "$match": { "election_id": election_id } },
            doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } },
        ];
        let mut stats = CandidateStats::default();
        let mut cursor = self.candidates.aggregate(pipeline, None).await?;
        while let Some(group) = cursor.try_next().await? {
            let count = match group.get("count") {
                Some(Bson::Int32(count)) => *count as u64,
                Some(Bson::Int64(count)) => *count as u64,
                _ => 0,
            };
            match group.get("_id") {
                Some(Bson::String(status)) if status == "APPROVED" => stats.approved = count,
                Some(Bson::String(status)) if status == "PENDING" => stats.pending = count,
                Some(Bson::String(status)) if status == "REJECTED" => stats.rejected = count,
                _ => continue,
            }
            stats.total += count;
        }
        Ok(stats)
    }

    /// Candidate row or NotFound.
    async fn candidate_by_id(&self, candidate_id: Id) -> Result<Candidate> {
        self.candidates
            .find_one(candidate_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))
    }

    /// Unauthorized unless the requester holds the admin relation for the
    /// election.
    async fn ensure_election_admin(&self, election_id: Id, requester: Id) -> Result<()> {
        let filter = doc! { "election_id": election_id, "user_id": requester };
        self.admins
            .find_one(filter, None)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                Error::unauthorized("Only the election creator can manage its candidacies")
            })
    }

    /// Attach the linked user profile to a candidacy row.
    async fn view(&self, candidate: Candidate) -> Result<CandidateView> {
        let user = self
            .users
            .find_one(candidate.user_id.as_doc(), None)
            .await?;
        Ok(CandidateView::new(candidate, user))
    }

    async fn views(&self, candidates: Vec<Candidate>) -> Result<Vec<CandidateView>> {
        let mut views = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            views.push(self.view(candidate).await?);
        }
        Ok(views)
    }
}

/// Gate for new registrations against the election's state.
fn ensure_registrable(election: &Election) -> Result<()> {
    if election.state.accepts_candidates() {
        Ok(())
    } else {
        Err(Error::precondition_failed(format!(
            "Cannot register candidates for {} elections",
            election.state.describe()
        )))
    }
}
