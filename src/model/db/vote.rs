use std::collections::HashMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use log::{info, warn};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::{FindOptions, SessionOptions},
    Client, ClientSession, Database,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Rejection, Result};
use crate::model::{
    api::vote::{TallyAudit, VoteReceipt, VoteRequest},
    common::{identity::IdentityNumber, phase::Phase, wallet::WalletAddress},
    db::{candidate::Candidate, phase::PhaseRecord, registration::Registration},
    mongodb::{
        errors::is_duplicate_key_error,
        transaction::{self, should_retry},
        u32_id_filter, Coll, Id,
    },
};

/// The audit trail entry for one cast vote. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecordCore {
    pub identity_number: IdentityNumber,
    pub wallet_address: WalletAddress,
    pub candidate_id: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

pub type NewVoteRecord = VoteRecordCore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub record: VoteRecordCore,
}

impl Deref for VoteRecord {
    type Target = VoteRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl VoteRecord {
    /// Cast the vote of a verified registration for a candidate.
    ///
    /// Marking the registration as voted, incrementing the candidate's tally
    /// and appending the audit record happen in a single transaction. Of any
    /// number of concurrent casts for one registration, exactly one commits;
    /// the rest see [`Rejection::AlreadyVoted`].
    pub async fn cast(
        db: &Database,
        db_client: &Client,
        request: &VoteRequest,
    ) -> Result<VoteReceipt> {
        let registration = Registration::find_for_vote(
            &Coll::from_db(db),
            &request.identity_number,
            &request.wallet_address,
        )
        .await?;
        if registration.has_voted {
            warn!(
                "Rejected repeat vote by {}",
                registration.identity_number.masked()
            );
            return Err(Rejection::AlreadyVoted.into());
        }
        if !registration.is_verified {
            return Err(Rejection::NotVerified.into());
        }
        PhaseRecord::require(&Coll::from_db(db), Phase::Voting).await?;

        let mut session = db_client.start_session(None).await?;
        let mut attempt = 1;
        let receipt = loop {
            session.start_transaction(None).await?;
            let result =
                Self::record(db, &mut session, &registration, request.candidate_id).await;
            let result = match result {
                Ok(receipt) => transaction::commit(&mut session)
                    .await
                    .map(|_| receipt)
                    .map_err(Error::from),
                Err(err) => {
                    transaction::abort(&mut session).await;
                    Err(err)
                }
            };
            match result {
                Ok(receipt) => break receipt,
                Err(Error::Rejected(Rejection::AlreadyVoted)) => {
                    warn!(
                        "Rejected concurrent vote by {}",
                        registration.identity_number.masked()
                    );
                    return Err(Rejection::AlreadyVoted.into());
                }
                Err(err) => {
                    if !should_retry(&err, attempt).await {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        };

        info!(
            "Vote cast by {} for candidate {}",
            registration.identity_number.masked(),
            receipt.candidate_id
        );
        Ok(receipt)
    }

    /// The three writes of a vote, inside the session's transaction.
    async fn record(
        db: &Database,
        session: &mut ClientSession,
        registration: &Registration,
        candidate_id: u32,
    ) -> Result<VoteReceipt> {
        // Only a registration that has not voted yet may be flipped.
        let not_voted = doc! {
            "_id": *registration.id,
            "has_voted": false,
        };
        let mark = doc! {
            "$set": { "has_voted": true }
        };
        let marked = Coll::<Registration>::from_db(db)
            .update_one_with_session(not_voted, mark, None, session)
            .await?;
        if marked.modified_count == 0 {
            return Err(Rejection::AlreadyVoted.into());
        }

        let increment = doc! {
            "$inc": { "votes": 1 }
        };
        let counted = Coll::<Candidate>::from_db(db)
            .update_one_with_session(u32_id_filter(candidate_id), increment, None, session)
            .await?;
        if counted.matched_count == 0 {
            return Err(Rejection::UnknownCandidate(candidate_id).into());
        }

        let record = NewVoteRecord {
            identity_number: registration.identity_number.clone(),
            wallet_address: registration.wallet_address.clone(),
            candidate_id,
            timestamp: Utc::now(),
        };
        let vote_id = match Coll::<NewVoteRecord>::from_db(db)
            .insert_one_with_session(&record, None, session)
            .await
        {
            Ok(result) => result.inserted_id.as_object_id().map(Id::from),
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(Rejection::AlreadyVoted.into())
            }
            Err(err) => return Err(err.into()),
        }
        .ok_or_else(|| Error::not_found("Inserted vote record ID".to_string()))?;

        Ok(VoteReceipt {
            vote_id: vote_id.to_string(),
            candidate_id,
            timestamp: record.timestamp,
        })
    }

    /// Reconcile every candidate's tally against the vote records, reading
    /// both from one consistent snapshot.
    pub async fn audit(db: &Database, db_client: &Client) -> Result<Vec<TallyAudit>> {
        let options = SessionOptions::builder().snapshot(true).build();
        let mut session = db_client.start_session(Some(options)).await?;

        let mut recorded: HashMap<u32, u32> = HashMap::new();
        let mut votes = Coll::<VoteRecord>::from_db(db)
            .find_with_session(None, None, &mut session)
            .await?;
        while let Some(vote) = votes.next(&mut session).await {
            *recorded.entry(vote?.candidate_id).or_default() += 1;
        }

        let mut audits = Vec::new();
        let sort = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let mut candidates = Coll::<Candidate>::from_db(db)
            .find_with_session(None, sort, &mut session)
            .await?;
        while let Some(candidate) = candidates.next(&mut session).await {
            let candidate = candidate?;
            let recorded_votes = recorded.remove(&candidate.id).unwrap_or(0);
            audits.push(TallyAudit {
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                tally: candidate.votes,
                recorded_votes,
                consistent: candidate.votes == recorded_votes,
            });
        }

        // Records for candidates that no longer exist can never reconcile.
        for (candidate_id, recorded_votes) in recorded {
            warn!("{recorded_votes} vote records reference missing candidate {candidate_id}");
            audits.push(TallyAudit {
                candidate_id,
                name: String::new(),
                tally: 0,
                recorded_votes,
                consistent: false,
            });
        }
        Ok(audits)
    }
}
