use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::ElectionState, mongodb::Id};

/// An election, as stored in the database.
///
/// Elections are created and scheduled elsewhere; this engine reads them,
/// keeps `total_candidates` consistent, and caches the winner pointer once
/// results are in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// Election title.
    pub title: String,
    /// Election state.
    pub state: ElectionState,
    /// Denormalised count of Pending and Approved candidacies.
    #[serde(default)]
    pub total_candidates: i64,
    /// Size of the voter roll, when maintained explicitly. Zero means the
    /// roll must be counted instead.
    #[serde(default)]
    pub total_voters: u64,
    /// Voting opens.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Cached winner, set when results are persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Id>,
}
