use log::debug;
use mongodb::{bson::doc, options::UpdateOptions, Database};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::model::{common::identity::IdentityNumber, mongodb::Coll};

/// A known national identity, keyed by its number. Reference data: seeded
/// once from configuration and never mutated while serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub number: IdentityNumber,
    pub is_minor: bool,
}

/// Whether an identity may take part in the election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub minor: bool,
}

impl Identity {
    /// Look up an identity by number.
    pub async fn find(identities: &Coll<Identity>, number: &IdentityNumber) -> Result<Identity> {
        identities
            .find_one(doc! { "_id": number.as_str() }, None)
            .await?
            .ok_or_else(|| Rejection::UnknownIdentity.into())
    }

    /// Minors are never eligible, regardless of phase.
    pub fn eligibility(&self) -> Eligibility {
        Eligibility {
            eligible: !self.is_minor,
            minor: self.is_minor,
        }
    }
}

/// Determine whether the given identity number is eligible to vote.
pub async fn check_eligibility(db: &Database, number: &IdentityNumber) -> Result<Eligibility> {
    let identity = Identity::find(&Coll::from_db(db), number).await?;
    Ok(identity.eligibility())
}

/// An identity record as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySeed {
    pub number: IdentityNumber,
    #[serde(default)]
    pub minor: bool,
}

/// Insert every configured identity that is not yet present.
///
/// This operation is idempotent, and never overwrites an existing record.
pub async fn ensure_identities_seeded(
    identities: &Coll<Identity>,
    seeds: &[IdentitySeed],
) -> Result<()> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for seed in seeds {
        let update = doc! {
            "$setOnInsert": { "is_minor": seed.minor }
        };
        identities
            .update_one(doc! { "_id": seed.number.as_str() }, update, upsert.clone())
            .await?;
    }
    debug!("Seeded {} identities", seeds.len());
    Ok(())
}
