use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A voter-roll entry tying a user to an election.
///
/// Counted as the turnout denominator when the election does not carry an
/// explicit `total_voters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub user_id: Id,
}
