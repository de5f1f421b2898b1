mod candidate;
mod election;

pub use candidate::CandidateStatus;
pub use election::ElectionState;
