use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The condensed election result, as stored.
///
/// One record per election, upserted on regeneration, never historized.
/// The comparison between this record and a freshly built summary drives
/// the idempotence decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResult {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub total_votes: u64,
    pub turnout_percentage: f64,
    #[serde(default)]
    pub winner: Option<Id>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub generated_at: DateTime<Utc>,
}
