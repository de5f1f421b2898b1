use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A user profile. Owned by the identity system; read here only to embed
/// display details into candidate views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub fullname: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
}
