use serde::{Deserialize, Serialize};

use crate::model::db::candidate::Candidate;

/// A new candidate, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    pub age: u32,
    pub qualification: String,
}

/// A candidate and their current tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: u32,
    pub name: String,
    pub party: String,
    pub age: u32,
    pub qualification: String,
    pub votes: u32,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id,
            name: core.name,
            party: core.party,
            age: core.age,
            qualification: core.qualification,
            votes: core.votes,
        }
    }
}
