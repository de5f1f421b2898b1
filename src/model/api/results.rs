use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{
    common::ElectionState,
    db::{candidate::Candidate, election::Election, result::ElectionResult, user::User},
    mongodb::Id,
};

/// Round a percentage to two decimal places. Percentages are always fixed
/// to two decimals, never left unrounded or truncated.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One candidate's standing in a tallied election. Derived on every
/// aggregation pass, never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub candidate_id: Id,
    pub election_id: Id,
    /// Candidate's display name.
    pub name: String,
    pub party_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub total_votes: u64,
    /// Share of all cast votes, two-decimal rounded. Zero when no votes
    /// were cast at all.
    pub vote_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}

impl CandidateResult {
    /// Project one approved candidate against the election's cast-vote
    /// total.
    pub fn new(candidate: &Candidate, user: Option<&User>, votes_cast: u64) -> Self {
        let vote_percentage = if votes_cast > 0 {
            round2(candidate.total_votes as f64 / votes_cast as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            candidate_id: candidate.id,
            election_id: candidate.election_id,
            name: user
                .map(|user| user.fullname.clone())
                .unwrap_or_else(|| "Unknown Candidate".to_string()),
            party_name: if candidate.party_name.is_empty() {
                "Independent".to_string()
            } else {
                candidate.party_name.clone()
            },
            symbol: Some(candidate.symbol.clone()).filter(|symbol| !symbol.is_empty()),
            total_votes: candidate.total_votes,
            vote_percentage,
            profile_photo: user.and_then(|user| user.profile_photo.clone()),
        }
    }

    /// Chart label: the party carries the slice unless the candidate stands
    /// independent.
    pub fn label(&self) -> &str {
        if self.party_name == "Independent" {
            &self.name
        } else {
            &self.party_name
        }
    }

    /// Proportion-view slice.
    pub fn to_pie_slice(&self) -> PieSlice {
        PieSlice {
            id: self.candidate_id,
            label: self.label().to_string(),
            value: self.total_votes,
            percentage: self.vote_percentage,
        }
    }

    /// Ranked-bar datum.
    pub fn to_bar_datum(&self) -> BarDatum {
        BarDatum {
            label: self.label().to_string(),
            votes: self.total_votes,
            candidate_id: self.candidate_id,
            percentage: self.vote_percentage,
        }
    }
}

/// One slice of the proportion chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub id: Id,
    pub label: String,
    pub value: u64,
    pub percentage: f64,
}

/// One category of the ranked-bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarDatum {
    pub label: String,
    pub votes: u64,
    pub candidate_id: Id,
    pub percentage: f64,
}

/// Chart-ready projections. Both views are built once from the same ranked
/// list and carry identical per-candidate numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub pie: Vec<PieSlice>,
    pub bar: Vec<BarDatum>,
}

impl ChartData {
    pub fn from_results(results: &[CandidateResult]) -> Self {
        Self {
            pie: results.iter().map(CandidateResult::to_pie_slice).collect(),
            bar: results.iter().map(CandidateResult::to_bar_datum).collect(),
        }
    }
}

/// The voting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeframe {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Presentation-ready summary of a completed election.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionResultSummary {
    pub election_id: Id,
    pub title: String,
    pub state: ElectionState,
    /// When the persisted record was generated; the build instant until a
    /// record exists.
    pub generated_at: DateTime<Utc>,
    pub total_votes: u64,
    pub total_registered_voters: u64,
    /// Votes cast over registered voters, two-decimal rounded. Zero when
    /// no voters are registered.
    pub turnout_percentage: f64,
    /// Ranked by descending vote total; the fetch order is authoritative.
    pub candidates: Vec<CandidateResult>,
    /// Head of the ranked list, absent when no candidate stood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<CandidateResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub timeframe: Timeframe,
    pub chart: ChartData,
}

impl ElectionResultSummary {
    /// Assemble the summary.
    ///
    /// `ranked` must already be ordered by descending vote total; the
    /// builder never re-sorts, so that ordering decides both the display
    /// ranking and the winner. `stored` is the previously persisted record,
    /// if any; its remarks and generation timestamp carry over.
    pub fn build(
        election: &Election,
        ranked: &[(Candidate, Option<User>)],
        votes_cast: u64,
        registered_voters: u64,
        stored: Option<&ElectionResult>,
    ) -> Self {
        let turnout_percentage = if registered_voters > 0 {
            round2(votes_cast as f64 / registered_voters as f64 * 100.0)
        } else {
            0.0
        };

        let candidates: Vec<CandidateResult> = ranked
            .iter()
            .map(|(candidate, user)| CandidateResult::new(candidate, user.as_ref(), votes_cast))
            .collect();
        let winner = candidates.first().cloned();
        let chart = ChartData::from_results(&candidates);

        Self {
            election_id: election.id,
            title: election.title.clone(),
            state: election.state,
            generated_at: stored
                .map(|record| record.generated_at)
                .unwrap_or_else(Utc::now),
            total_votes: votes_cast,
            total_registered_voters: registered_voters,
            turnout_percentage,
            candidates,
            winner,
            remarks: stored.and_then(|record| record.remarks.clone()),
            timeframe: Timeframe {
                start: election.start_time,
                end: election.end_time,
            },
            chart,
        }
    }

    /// The winner's candidate id, when a winner exists.
    pub fn winner_id(&self) -> Option<Id> {
        self.winner.as_ref().map(|winner| winner.candidate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked_candidates(election_id: Id, votes: &[u64]) -> Vec<(Candidate, Option<User>)> {
        votes
            .iter()
            .map(|&total| {
                (
                    Candidate::approved_example(election_id, total),
                    Some(User::example()),
                )
            })
            .collect()
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(0.005), 0.01);
    }

    #[test]
    fn full_turnout_scenario() {
        let election = Election::completed_example(100);
        let ranked = ranked_candidates(election.id, &[50, 30, 20]);
        let summary = ElectionResultSummary::build(&election, &ranked, 100, 100, None);

        assert_eq!(summary.total_votes, 100);
        assert_eq!(summary.turnout_percentage, 100.0);
        let shares: Vec<f64> = summary
            .candidates
            .iter()
            .map(|candidate| candidate.vote_percentage)
            .collect();
        assert_eq!(shares, [50.0, 30.0, 20.0]);
        let winner = summary.winner.as_ref().unwrap();
        assert_eq!(winner.total_votes, 50);
        assert_eq!(summary.winner_id(), Some(summary.candidates[0].candidate_id));
    }

    #[test]
    fn no_candidates_means_no_winner() {
        let election = Election::completed_example(10);
        let summary = ElectionResultSummary::build(&election, &[], 0, 10, None);

        assert_eq!(summary.turnout_percentage, 0.0);
        assert!(summary.winner.is_none());
        assert!(summary.winner_id().is_none());
        assert!(summary.candidates.is_empty());
        assert!(summary.chart.pie.is_empty());
        assert!(summary.chart.bar.is_empty());
    }

    #[test]
    fn zero_registered_voters_means_zero_turnout() {
        let election = Election::completed_example(0);
        let ranked = ranked_candidates(election.id, &[3]);
        let summary = ElectionResultSummary::build(&election, &ranked, 3, 0, None);
        assert_eq!(summary.turnout_percentage, 0.0);
    }

    #[test]
    fn zero_votes_cast_means_zero_shares() {
        let election = Election::completed_example(10);
        let ranked = ranked_candidates(election.id, &[0, 0]);
        let summary = ElectionResultSummary::build(&election, &ranked, 0, 10, None);
        for candidate in &summary.candidates {
            assert_eq!(candidate.vote_percentage, 0.0);
        }
    }

    #[test]
    fn shares_are_rounded_not_truncated() {
        let election = Election::completed_example(3);
        let ranked = ranked_candidates(election.id, &[2, 1]);
        let summary = ElectionResultSummary::build(&election, &ranked, 3, 3, None);
        assert_eq!(summary.candidates[0].vote_percentage, 66.67);
        assert_eq!(summary.candidates[1].vote_percentage, 33.33);
    }

    #[test]
    fn charts_agree_with_the_ranked_list() {
        let election = Election::completed_example(100);
        let ranked = ranked_candidates(election.id, &[50, 30, 20]);
        let summary = ElectionResultSummary::build(&election, &ranked, 100, 100, None);

        assert_eq!(summary.chart.pie.len(), summary.candidates.len());
        assert_eq!(summary.chart.bar.len(), summary.candidates.len());
        for ((slice, bar), candidate) in summary
            .chart
            .pie
            .iter()
            .zip(&summary.chart.bar)
            .zip(&summary.candidates)
        {
            assert_eq!(slice.id, candidate.candidate_id);
            assert_eq!(slice.value, candidate.total_votes);
            assert_eq!(slice.percentage, candidate.vote_percentage);
            assert_eq!(bar.candidate_id, candidate.candidate_id);
            assert_eq!(bar.votes, candidate.total_votes);
            assert_eq!(bar.percentage, candidate.vote_percentage);
            assert_eq!(slice.label, bar.label);
        }
    }

    #[test]
    fn builder_preserves_the_fetch_order() {
        let election = Election::completed_example(100);
        // Deliberately not descending: the builder must not re-sort.
        let ranked = ranked_candidates(election.id, &[10, 40]);
        let summary = ElectionResultSummary::build(&election, &ranked, 50, 100, None);
        assert_eq!(summary.candidates[0].total_votes, 10);
        assert_eq!(summary.winner.as_ref().unwrap().total_votes, 10);
    }

    #[test]
    fn independent_candidates_are_labelled_by_name() {
        let election = Election::completed_example(10);
        let mut candidate = Candidate::approved_example(election.id, 5);
        candidate.candidate.party_name = String::new();
        let user = User::example();
        let result = CandidateResult::new(&candidate, Some(&user), 10);
        assert_eq!(result.party_name, "Independent");
        assert_eq!(result.label(), user.fullname);

        let partied = Candidate::approved_example(election.id, 5);
        let result = CandidateResult::new(&partied, Some(&user), 10);
        assert_eq!(result.label(), partied.party_name);
    }

    #[test]
    fn missing_user_falls_back_to_placeholder_name() {
        let election = Election::completed_example(10);
        let candidate = Candidate::approved_example(election.id, 5);
        let result = CandidateResult::new(&candidate, None, 10);
        assert_eq!(result.name, "Unknown Candidate");
        assert!(result.profile_photo.is_none());
    }

    #[test]
    fn stored_record_carries_remarks_and_timestamp() {
        let election = Election::completed_example(10);
        let mut stored =
            ElectionResult::stored_example(election.id, 5, 50.0, None);
        stored.remarks = Some("Recount requested".to_string());
        let summary = ElectionResultSummary::build(&election, &[], 5, 10, Some(&stored));
        assert_eq!(summary.remarks.as_deref(), Some("Recount requested"));
        assert_eq!(summary.generated_at, stored.generated_at);
    }
}
