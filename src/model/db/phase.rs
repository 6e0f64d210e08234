use log::info;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::phase::Phase, mongodb::Coll};

/// `_id` of the only document in the phase collection.
const PHASE_RECORD_ID: &str = "current";

/// The stored election phase. Exactly one of these exists once the phase has
/// been read or written for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
}

impl PhaseRecord {
    /// Read the current phase, creating the record in the registration phase
    /// if it does not exist yet.
    pub async fn current(records: &Coll<PhaseRecord>) -> Result<Phase> {
        let update = doc! {
            "$setOnInsert": { "phase": Phase::default() }
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let record = records
            .find_one_and_update(doc! { "_id": PHASE_RECORD_ID }, update, options)
            .await?
            .ok_or_else(|| Error::not_found("Phase record after upsert".to_string()))?;
        Ok(record.phase)
    }

    /// Overwrite the current phase. Any phase may follow any other.
    pub async fn set(records: &Coll<PhaseRecord>, phase: Phase) -> Result<Phase> {
        let update = doc! {
            "$set": { "phase": phase }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        records
            .update_one(doc! { "_id": PHASE_RECORD_ID }, update, options)
            .await?;
        info!("Election phase is now '{phase}'");
        Ok(phase)
    }

    /// Fail with [`crate::error::Rejection::WrongPhase`] unless the election
    /// is currently in the `required` phase.
    pub async fn require(records: &Coll<PhaseRecord>, required: Phase) -> Result<()> {
        Ok(Self::current(records).await?.require(required)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;

    #[backend_test]
    async fn defaults_to_registration(records: Coll<PhaseRecord>) {
        assert_eq!(records.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(
            PhaseRecord::current(&records).await.unwrap(),
            Phase::Registration
        );
        // Reading twice must not create a second record.
        PhaseRecord::current(&records).await.unwrap();
        assert_eq!(records.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test]
    async fn any_transition_is_allowed(records: Coll<PhaseRecord>) {
        for phase in [Phase::Result, Phase::Registration, Phase::Voting] {
            assert_eq!(PhaseRecord::set(&records, phase).await.unwrap(), phase);
            assert_eq!(PhaseRecord::current(&records).await.unwrap(), phase);
        }
        assert_eq!(records.count_documents(None, None).await.unwrap(), 1);

        PhaseRecord::require(&records, Phase::Voting).await.unwrap();
        let wrong = PhaseRecord::require(&records, Phase::Registration).await;
        assert!(matches!(
            wrong,
            Err(Error::Rejected(Rejection::WrongPhase {
                required: Phase::Registration,
                actual: Phase::Voting,
            }))
        ));
    }
}
