use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single cast vote.
///
/// The engine never creates or mutates these; their exact count is the
/// authoritative votes-cast figure, independent of the denormalised
/// per-candidate totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub candidate_id: Id,
    pub voter_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}
