use std::ops::Deref;

use log::info;
use mongodb::{bson::doc, options::FindOptions, Database};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Rejection, Result};
use crate::model::{
    api::candidate::CandidateSpec,
    common::phase::Phase,
    db::phase::PhaseRecord,
    mongodb::{Coll, Counter, CANDIDATE_ID_COUNTER_ID},
};

/// Candidates must be strictly older than this.
pub const MIN_CANDIDATE_AGE: u32 = 18;

/// Core candidate data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub party: String,
    pub age: u32,
    pub qualification: String,
    /// Running tally. Only ever incremented, and only by casting a vote.
    pub votes: u32,
}

/// A candidate from the database. IDs are allocated in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: u32,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl TryFrom<CandidateSpec> for CandidateCore {
    type Error = Error;

    fn try_from(spec: CandidateSpec) -> Result<Self> {
        let name = spec.name.trim();
        let party = spec.party.trim();
        let qualification = spec.qualification.trim();
        if name.is_empty() || party.is_empty() || qualification.is_empty() {
            return Err(Error::bad_request("All candidate fields are required."));
        }
        if spec.age <= MIN_CANDIDATE_AGE {
            return Err(Rejection::AgeTooLow(spec.age).into());
        }
        Ok(Self {
            name: name.to_string(),
            party: party.to_string(),
            age: spec.age,
            qualification: qualification.to_string(),
            votes: 0,
        })
    }
}

impl Candidate {
    /// Add a new candidate with no votes.
    pub async fn add(db: &Database, spec: CandidateSpec) -> Result<Candidate> {
        let core = CandidateCore::try_from(spec)?;
        PhaseRecord::require(&Coll::from_db(db), Phase::Registration).await?;

        let id = Counter::next(&Coll::from_db(db), CANDIDATE_ID_COUNTER_ID).await?;
        let candidate = Candidate {
            id,
            candidate: core,
        };
        Coll::<Candidate>::from_db(db)
            .insert_one(&candidate, None)
            .await?;
        info!("Added candidate {} '{}'", candidate.id, candidate.name);
        Ok(candidate)
    }

    /// All candidates in insertion order.
    pub async fn list(candidates: &Coll<Candidate>) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        Ok(candidates.find(None, options).await?.try_collect().await?)
    }

    /// All candidates by descending tally, ties in insertion order.
    pub async fn ranked(candidates: &Coll<Candidate>) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder()
            .sort(doc! { "votes": -1, "_id": 1 })
            .build();
        Ok(candidates.find(None, options).await?.try_collect().await?)
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    impl CandidateSpec {
        pub fn example() -> Self {
            Self {
                name: "Ada Example".to_string(),
                party: "Analytical Party".to_string(),
                age: 36,
                qualification: "Mathematician".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Grace Example".to_string(),
                party: "Compiler Party".to_string(),
                age: 45,
                qualification: "Rear admiral".to_string(),
            }
        }

        pub fn aged(age: u32) -> Self {
            Self {
                age,
                ..Self::example()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn age_boundary_is_exclusive() {
        let too_young = CandidateCore::try_from(CandidateSpec::aged(18));
        assert!(matches!(
            too_young,
            Err(Error::Rejected(Rejection::AgeTooLow(18)))
        ));
        let old_enough = CandidateCore::try_from(CandidateSpec::aged(19)).unwrap();
        assert_eq!(old_enough.age, 19);
        assert_eq!(old_enough.votes, 0);
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut spec = CandidateSpec::example();
        spec.party = "  ".to_string();
        assert!(CandidateCore::try_from(spec).is_err());
    }

    #[backend_test]
    async fn ids_follow_insertion_order(db: Database, candidates: Coll<Candidate>) {
        let first = Candidate::add(&db, CandidateSpec::example()).await.unwrap();
        let second = Candidate::add(&db, CandidateSpec::example2()).await.unwrap();
        assert!(first.id < second.id);

        let listed = Candidate::list(&candidates).await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[backend_test]
    async fn ranking_is_stable(db: Database, candidates: Coll<Candidate>) {
        let a = Candidate::add(&db, CandidateSpec::example()).await.unwrap();
        let b = Candidate::add(&db, CandidateSpec::example2()).await.unwrap();
        let c = Candidate::add(&db, CandidateSpec::aged(50)).await.unwrap();

        // b leads, a and c tie and keep their insertion order.
        for (id, votes) in [(a.id, 1), (b.id, 3), (c.id, 1)] {
            candidates
                .update_one(doc! { "_id": id }, doc! { "$set": { "votes": votes } }, None)
                .await
                .unwrap();
        }
        let ranked: Vec<u32> = Candidate::ranked(&candidates)
            .await
            .unwrap()
            .into_iter()
            .map(|candidate| candidate.id)
            .collect();
        assert_eq!(ranked, vec![b.id, a.id, c.id]);
    }

    #[backend_test]
    async fn too_young_is_not_stored(db: Database, candidates: Coll<Candidate>) {
        let result = Candidate::add(&db, CandidateSpec::aged(18)).await;
        assert!(matches!(result, Err(Error::Rejected(Rejection::AgeTooLow(18)))));
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
    }
}
