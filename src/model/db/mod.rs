pub mod admin;
pub mod candidate;
pub mod election;
pub mod result;
pub mod user;
pub mod vote;
pub mod voter;
