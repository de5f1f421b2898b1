use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    admin::AdminRelation,
    candidate::{Candidate, NewCandidate},
    election::Election,
    result::ElectionResult,
    user::User,
    vote::Vote,
    voter::Voter,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Election collection
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

// User collection
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

// Vote collection
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}

// Voter-roll collection
const VOTERS: &str = "voters";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}

// Admin-relation collection
const ADMINS: &str = "election_admins";
impl MongoCollection for AdminRelation {
    const NAME: &'static str = ADMINS;
}

// Result collection
const RESULTS: &str = "election_results";
impl MongoCollection for ElectionResult {
    const NAME: &'static str = RESULTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One candidacy per user per election.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "user_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // One condensed result record per election.
    let result_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ElectionResult>::from_db(db)
        .create_index(result_index, None)
        .await?;

    // One voter-roll entry per user per election.
    let voter_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "user_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // One vote per voter per election.
    let vote_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "voter_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // One admin relation per user per election.
    let admin_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "user_id": 1})
        .options(unique)
        .build();
    Coll::<AdminRelation>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    Ok(())
}
