//! Result aggregation for completed elections: building presentation-ready
//! summaries and keeping the stored condensed record in step with them.
//!
//! Reads are idempotent: a summary is recomputed on every request, but the
//! stored record is only rewritten when the numbers have drifted (or a
//! regeneration was explicitly requested).

use chrono::Utc;
use futures::TryStreamExt;
use log::{debug, error, info};
use mongodb::{
    bson::{doc, Bson, DateTime},
    options::{FindOptions, UpdateOptions},
    Client, Database,
};

use crate::error::{Error, Result};
use crate::model::{
    api::results::ElectionResultSummary,
    common::{CandidateStatus, ElectionState},
    db::{
        candidate::Candidate, election::Election, result::ElectionResult, user::User, vote::Vote,
        voter::Voter,
    },
    mongodb::{Coll, Id},
};

/// Builds summaries for completed elections and conditionally persists the
/// condensed record, keeping it and the election's cached winner pointer
/// consistent.
///
/// Holds its storage handles explicitly; construct one per database with
/// [`ResultCoordinator::new`].
pub struct ResultCoordinator {
    client: Client,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    users: Coll<User>,
    votes: Coll<Vote>,
    voters: Coll<Voter>,
    results: Coll<ElectionResult>,
}

impl ResultCoordinator {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            users: Coll::from_db(db),
            votes: Coll::from_db(db),
            voters: Coll::from_db(db),
            results: Coll::from_db(db),
        }
    }

    /// Summaries for every completed election, newest-ended first. Builds
    /// only; never persists.
    pub async fn list_completed(&self) -> Result<Vec<ElectionResultSummary>> {
        let filter = doc! { "state": ElectionState::Completed };
        let options = FindOptions::builder().sort(doc! { "end_time": -1 }).build();
        let elections: Vec<Election> = self
            .elections
            .find(filter, options)
            .await?
            .try_collect()
            .await?;

        let mut summaries = Vec::with_capacity(elections.len());
        for election in elections {
            let stored = self.stored_result(election.id).await?;
            summaries.push(self.summarise(&election, stored.as_ref()).await?);
        }
        Ok(summaries)
    }

    /// The result for one completed election, persisting the condensed
    /// record when it has drifted from the fresh computation.
    pub async fn get_result(&self, election_id: Id) -> Result<ElectionResultSummary> {
        self.result_for(election_id, false).await
    }

    /// As [`ResultCoordinator::get_result`], but always persists.
    pub async fn regenerate(&self, election_id: Id) -> Result<ElectionResultSummary> {
        self.result_for(election_id, true).await
    }

    async fn result_for(&self, election_id: Id, regenerate: bool) -> Result<ElectionResultSummary> {
        let election = self
            .elections
            .find_one(election_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        if election.state != ElectionState::Completed {
            return Err(Error::precondition_failed(format!(
                "Election {election_id} is not completed yet"
            )));
        }

        let stored = self.stored_result(election_id).await?;
        let summary = self.summarise(&election, stored.as_ref()).await?;

        if needs_persist(stored.as_ref(), &summary, regenerate) {
            // A failed write must not cost the caller the summary it asked
            // for, but operators need to hear about the drifting cache.
            if let Err(err) = self.persist(&election, &summary).await {
                error!("Failed to persist result for election {election_id}: {err}");
            }
        } else {
            debug!("Result for election {election_id} is unchanged, skipping persist");
        }

        Ok(summary)
    }

    /// Assemble the summary from its inputs.
    ///
    /// The cast-vote count comes from the vote records themselves, not the
    /// denormalised per-candidate totals, and the candidate fetch order
    /// (descending votes, earliest registration first on ties) decides the
    /// ranking and the winner.
    async fn summarise(
        &self,
        election: &Election,
        stored: Option<&ElectionResult>,
    ) -> Result<ElectionResultSummary> {
        let votes_cast = self
            .votes
            .count_documents(doc! { "election_id": election.id }, None)
            .await?;

        let registered_voters = if election.total_voters > 0 {
            election.total_voters
        } else {
            self.voters
                .count_documents(doc! { "election_id": election.id }, None)
                .await?
        };

        let filter = doc! { "election_id": election.id, "status": CandidateStatus::Approved };
        let options = FindOptions::builder()
            .sort(doc! { "total_votes": -1, "registered_at": 1 })
            .build();
        let candidates: Vec<Candidate> = self
            .candidates
            .find(filter, options)
            .await?
            .try_collect()
            .await?;

        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let user = self
                .users
                .find_one(candidate.user_id.as_doc(), None)
                .await?;
            ranked.push((candidate, user));
        }

        Ok(ElectionResultSummary::build(
            election,
            &ranked,
            votes_cast,
            registered_voters,
            stored,
        ))
    }

    async fn stored_result(&self, election_id: Id) -> Result<Option<ElectionResult>> {
        Ok(self
            .results
            .find_one(doc! { "election_id": election_id }, None)
            .await?)
    }

    /// Upsert the condensed record and refresh the election's cached winner
    /// pointer, atomically: a failure partway leaves neither applied.
    async fn persist(&self, election: &Election, summary: &ElectionResultSummary) -> Result<()> {
        let winner_id = summary.winner_id();

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! { "election_id": election.id };
        let set = doc! {
            "election_id": election.id,
            "total_votes": summary.total_votes as i64,
            "turnout_percentage": summary.turnout_percentage,
            "winner": winner_id.map(Bson::from).unwrap_or(Bson::Null),
            "remarks": summary.remarks.clone().map(Bson::from).unwrap_or(Bson::Null),
            "generated_at": DateTime::from_chrono(Utc::now()),
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.results
            .update_one_with_session(filter, doc! { "$set": set }, options, &mut session)
            .await?;

        if let Some(winner) = winner_id {
            let update = doc! { "$set": { "winner": winner } };
            self.elections
                .update_one_with_session(election.id.as_doc(), update, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        info!("Persisted result for election {}", election.id);
        Ok(())
    }
}

/// Decide whether a freshly built summary must overwrite the stored record.
///
/// Reads of an unchanged election stay write-free; an explicit regeneration
/// request, a missing record, or any drift in the numbers forces the write.
fn needs_persist(
    stored: Option<&ElectionResult>,
    summary: &ElectionResultSummary,
    regenerate: bool,
) -> bool {
    if regenerate {
        return true;
    }
    let stored = match stored {
        Some(stored) => stored,
        None => return true,
    };
    stored.total_votes != summary.total_votes
        || stored.turnout_percentage != summary.turnout_percentage
        || summary
            .winner_id()
            .map_or(false, |id| stored.winner != Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_for(
        election: &Election,
        votes: &[u64],
        votes_cast: u64,
        registered: u64,
    ) -> ElectionResultSummary {
        let ranked: Vec<(Candidate, Option<User>)> = votes
            .iter()
            .map(|&total| {
                (
                    Candidate::approved_example(election.id, total),
                    Some(User::example()),
                )
            })
            .collect();
        ElectionResultSummary::build(election, &ranked, votes_cast, registered, None)
    }

    #[test]
    fn missing_record_forces_a_write() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        assert!(needs_persist(None, &summary, false));
    }

    #[test]
    fn matching_record_skips_the_write() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes,
            summary.turnout_percentage,
            summary.winner_id(),
        );
        assert!(!needs_persist(Some(&stored), &summary, false));
    }

    #[test]
    fn regeneration_always_writes() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes,
            summary.turnout_percentage,
            summary.winner_id(),
        );
        assert!(needs_persist(Some(&stored), &summary, true));
    }

    #[test]
    fn vote_drift_forces_a_write() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes - 1,
            summary.turnout_percentage,
            summary.winner_id(),
        );
        assert!(needs_persist(Some(&stored), &summary, false));
    }

    #[test]
    fn turnout_drift_forces_a_write() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes,
            summary.turnout_percentage - 0.5,
            summary.winner_id(),
        );
        assert!(needs_persist(Some(&stored), &summary, false));
    }

    #[test]
    fn winner_change_forces_a_write() {
        let election = Election::completed_example(100);
        let summary = summary_for(&election, &[50, 30, 20], 100, 100);
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes,
            summary.turnout_percentage,
            Some(Id::new()),
        );
        assert!(needs_persist(Some(&stored), &summary, false));
    }

    #[test]
    fn absent_winner_does_not_force_a_write_on_its_own() {
        let election = Election::completed_example(10);
        let summary = summary_for(&election, &[], 0, 10);
        assert!(summary.winner_id().is_none());
        // Stored record still points at a long-gone winner, but with no new
        // winner the idempotence check only watches the numbers.
        let stored = ElectionResult::stored_example(
            election.id,
            summary.total_votes,
            summary.turnout_percentage,
            Some(Id::new()),
        );
        assert!(!needs_persist(Some(&stored), &summary, false));
    }
}
