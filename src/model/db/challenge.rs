use chrono::{DateTime, Duration, Utc};
use log::debug;
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document},
    options::ReplaceOptions,
    ClientSession,
};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, Result};
use crate::mail::Mail;
use crate::model::{common::code::Code, mongodb::Coll};

/// A one-time passcode sent to a contact address.
///
/// At most one challenge exists per address; issuing a new one replaces the
/// old. A challenge past its `expire_at` is treated as absent, whether or not
/// the TTL index has purged it yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "_id")]
    pub contact_address: String,
    pub code: Code,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expire_at: DateTime<Utc>,
}

impl Challenge {
    /// Generate a fresh challenge for `contact_address`, valid for `ttl`.
    pub fn new(contact_address: &str, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            contact_address: contact_address.to_string(),
            code: Code::random(),
            created_at,
            expire_at: created_at + ttl,
        }
    }

    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expire_at
    }

    /// The mail delivering this challenge's code.
    pub fn mail(&self, subject: &str, ttl: Duration) -> Mail {
        Mail {
            recipient: self.contact_address.clone(),
            subject: subject.to_string(),
            body: format!(
                "Your OTP is: {}. It is valid for {} seconds.",
                self.code,
                ttl.num_seconds()
            ),
        }
    }

    fn filter(&self) -> Document {
        doc! { "_id": &self.contact_address }
    }

    /// Store this challenge, superseding any previous one for the same address.
    pub async fn store(&self, challenges: &Coll<Challenge>) -> Result<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        challenges.replace_one(self.filter(), self, options).await?;
        Ok(())
    }

    /// As [`Challenge::store`], inside the session's transaction.
    pub async fn store_with_session(
        &self,
        challenges: &Coll<Challenge>,
        session: &mut ClientSession,
    ) -> Result<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        challenges
            .replace_one_with_session(self.filter(), self, options, session)
            .await?;
        Ok(())
    }

    /// Consume the live challenge for `contact_address` if `code` matches it.
    /// A malformed code simply never matches.
    ///
    /// A challenge can only be consumed once. A wrong code leaves the
    /// challenge in place so the correct one may still be entered before it expires.
    pub async fn consume(
        challenges: &Coll<Challenge>,
        contact_address: &str,
        code: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let matching = doc! {
            "_id": contact_address,
            "code": code.trim(),
            "expire_at": { "$gt": now },
        };
        if challenges
            .find_one_and_delete(matching, None)
            .await?
            .is_some()
        {
            debug!("Consumed challenge for {contact_address}");
            return Ok(());
        }

        let live = doc! {
            "_id": contact_address,
            "expire_at": { "$gt": now },
        };
        match challenges.find_one(live, None).await? {
            Some(_) => Err(Rejection::CodeMismatch.into()),
            None => Err(Rejection::ChallengeExpiredOrMissing.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;
    use crate::error::Error;

    const CONTACT: &str = "a@x.com";

    #[test]
    fn liveness_window() {
        let challenge = Challenge::new(CONTACT, Duration::seconds(60));
        assert!(challenge.is_live_at(challenge.created_at));
        assert!(challenge.is_live_at(challenge.created_at + Duration::seconds(59)));
        assert!(!challenge.is_live_at(challenge.created_at + Duration::seconds(60)));
        assert!(!challenge.is_live_at(challenge.created_at + Duration::minutes(5)));
    }

    #[test]
    fn mail_contains_code() {
        let challenge = Challenge::new(CONTACT, Duration::seconds(60));
        let mail = challenge.mail("OTP Verification", Duration::seconds(60));
        assert_eq!(mail.recipient, CONTACT);
        assert!(mail.body.contains(&challenge.code.to_string()));
        assert!(mail.body.contains("60 seconds"));
    }

    #[backend_test]
    async fn consume_once(challenges: Coll<Challenge>) {
        let challenge = Challenge::new(CONTACT, Duration::seconds(60));
        challenge.store(&challenges).await.unwrap();

        Challenge::consume(&challenges, CONTACT, &challenge.code.to_string())
            .await
            .unwrap();
        let again = Challenge::consume(&challenges, CONTACT, &challenge.code.to_string()).await;
        assert!(matches!(
            again,
            Err(Error::Rejected(Rejection::ChallengeExpiredOrMissing))
        ));
    }

    #[backend_test]
    async fn wrong_code_is_a_mismatch(challenges: Coll<Challenge>) {
        let challenge = Challenge::new(CONTACT, Duration::seconds(60));
        challenge.store(&challenges).await.unwrap();

        let wrong = if challenge.code.to_string() == "000000" {
            "111111"
        } else {
            "000000"
        };
        let result = Challenge::consume(&challenges, CONTACT, wrong).await;
        assert!(matches!(
            result,
            Err(Error::Rejected(Rejection::CodeMismatch))
        ));

        // The challenge survives a wrong guess.
        Challenge::consume(&challenges, CONTACT, &challenge.code.to_string())
            .await
            .unwrap();
    }

    #[backend_test]
    async fn expired_challenge_is_absent(challenges: Coll<Challenge>) {
        // Stored but already expired, as if the TTL monitor had not run yet.
        let mut challenge = Challenge::new(CONTACT, Duration::seconds(60));
        challenge.created_at = challenge.created_at - Duration::seconds(61);
        challenge.expire_at = challenge.expire_at - Duration::seconds(61);
        challenge.store(&challenges).await.unwrap();

        let result = Challenge::consume(&challenges, CONTACT, &challenge.code.to_string()).await;
        assert!(matches!(
            result,
            Err(Error::Rejected(Rejection::ChallengeExpiredOrMissing))
        ));
    }

    #[backend_test]
    async fn new_challenge_supersedes_old(challenges: Coll<Challenge>) {
        let first = Challenge::new(CONTACT, Duration::seconds(60));
        first.store(&challenges).await.unwrap();
        let mut second = Challenge::new(CONTACT, Duration::seconds(60));
        while second.code == first.code {
            second = Challenge::new(CONTACT, Duration::seconds(60));
        }
        second.store(&challenges).await.unwrap();

        let count = challenges
            .count_documents(doc! { "_id": CONTACT }, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let stale = Challenge::consume(&challenges, CONTACT, &first.code.to_string()).await;
        assert!(matches!(stale, Err(Error::Rejected(Rejection::CodeMismatch))));
        Challenge::consume(&challenges, CONTACT, &second.code.to_string())
            .await
            .unwrap();
    }
}
