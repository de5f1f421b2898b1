use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The admin relation: a row grants its user the right to approve and
/// reject candidacies for the election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRelation {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub user_id: Id,
}
