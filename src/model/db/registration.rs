use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    options::FindOptions,
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Rejection, Result};
use crate::mail::Mailer;
use crate::model::{
    api::registration::RegisterRequest,
    common::{identity::IdentityNumber, phase::Phase, wallet::WalletAddress},
    db::{account::Account, challenge::Challenge, identity::Identity, phase::PhaseRecord},
    mongodb::{
        errors::is_duplicate_key_error,
        transaction::{self, should_retry},
        Coll, Id,
    },
};

pub const VERIFICATION_SUBJECT: &str = "OTP Verification";
pub const RESEND_SUBJECT: &str = "New OTP for Verification";

/// The durable binding of an identity, a contact address and a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationCore {
    pub identity_number: IdentityNumber,
    pub contact_address: String,
    pub wallet_address: WalletAddress,
    pub is_verified: bool,
    pub has_voted: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl RegistrationCore {
    /// A fresh, unverified registration that has not voted.
    pub fn new(
        identity_number: IdentityNumber,
        contact_address: String,
        wallet_address: WalletAddress,
    ) -> Self {
        Self {
            identity_number,
            contact_address,
            wallet_address,
            is_verified: false,
            has_voted: false,
            created_at: Utc::now(),
        }
    }
}

pub type NewRegistration = RegistrationCore;

/// A registration from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub registration: RegistrationCore,
}

impl Deref for Registration {
    type Target = RegistrationCore;

    fn deref(&self) -> &Self::Target {
        &self.registration
    }
}

impl DerefMut for Registration {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.registration
    }
}

/// How a registration attempt ended, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A passcode was sent; the registrant must confirm it next.
    Pending,
    /// The identity belongs to a minor. Not an error: the registrant is sent
    /// to the age check page instead.
    MinorRejected,
}

impl RegistrationOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Pending => "OTP sent. Please verify.",
            Self::MinorRejected => "Applicants under 18 are not eligible to register.",
        }
    }

    /// The page the client should proceed to.
    pub fn redirect(&self) -> &'static str {
        match self {
            Self::Pending => "emailverify.html",
            Self::MinorRejected => "checkage.html",
        }
    }
}

impl Registration {
    /// Register an identity with a wallet and contact address, and send a
    /// passcode to the contact address.
    ///
    /// The passcode is dispatched before anything is written, so a delivery
    /// failure leaves no registration behind. The challenge and the
    /// registration are then persisted together in one transaction.
    pub async fn register(
        db: &Database,
        db_client: &Client,
        mailer: &Mailer,
        otp_ttl: Duration,
        request: &RegisterRequest,
    ) -> Result<RegistrationOutcome> {
        PhaseRecord::require(&Coll::from_db(db), Phase::Registration).await?;

        // A malformed number cannot be a known identity.
        let identity_number: IdentityNumber = request
            .identity_number
            .trim()
            .parse()
            .map_err(|_| Rejection::UnknownIdentity)?;
        let identity = Identity::find(&Coll::from_db(db), &identity_number).await?;
        if identity.is_minor {
            info!(
                "Registration by minor {} redirected to age check",
                identity_number.masked()
            );
            return Ok(RegistrationOutcome::MinorRejected);
        }

        let wallet_address: WalletAddress = request
            .wallet_address
            .trim()
            .parse()
            .map_err(|_| Rejection::InvalidAddress)?;
        let contact_address = request.contact_address.trim().to_string();
        Account::require_exists(&Coll::from_db(db), &contact_address).await?;

        let registrations = Coll::<Registration>::from_db(db);
        let existing = doc! {
            "$or": [
                { "identity_number": identity_number.as_str() },
                { "wallet_address": wallet_address.as_str() },
            ]
        };
        if registrations.find_one(existing, None).await?.is_some() {
            return Err(Rejection::DuplicateRegistration.into());
        }

        // Deliver the passcode while nothing is held open.
        let challenge = Challenge::new(&contact_address, otp_ttl);
        mailer
            .dispatch(challenge.mail(VERIFICATION_SUBJECT, otp_ttl))
            .await?;

        let registration = NewRegistration::new(identity_number, contact_address, wallet_address);
        let mut session = db_client.start_session(None).await?;
        let mut attempt = 1;
        loop {
            session.start_transaction(None).await?;
            let result = Self::persist(db, &mut session, &challenge, &registration).await;
            let result = match result {
                Ok(()) => transaction::commit(&mut session).await.map_err(Error::from),
                Err(err) => {
                    transaction::abort(&mut session).await;
                    Err(err)
                }
            };
            match result {
                Ok(()) => break,
                Err(err) => {
                    if !should_retry(&err, attempt).await {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        }

        info!(
            "Registered identity {}, awaiting verification of {}",
            registration.identity_number.masked(),
            registration.contact_address
        );
        Ok(RegistrationOutcome::Pending)
    }

    async fn persist(
        db: &Database,
        session: &mut ClientSession,
        challenge: &Challenge,
        registration: &NewRegistration,
    ) -> Result<()> {
        challenge
            .store_with_session(&Coll::from_db(db), session)
            .await?;
        match Coll::<NewRegistration>::from_db(db)
            .insert_one_with_session(registration, None, session)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key_error(&err) => {
                Err(Rejection::DuplicateRegistration.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Consume the passcode for `contact_address` and mark every registration
    /// using that address as verified.
    ///
    /// Returns whether any registration was verified.
    pub async fn confirm(db: &Database, contact_address: &str, code: &str) -> Result<bool> {
        PhaseRecord::require(&Coll::from_db(db), Phase::Registration).await?;

        let contact_address = contact_address.trim();
        Challenge::consume(&Coll::from_db(db), contact_address, code).await?;

        let update = doc! {
            "$set": { "is_verified": true }
        };
        let result = Coll::<Registration>::from_db(db)
            .update_many(doc! { "contact_address": contact_address }, update, None)
            .await?;
        if result.matched_count > 0 {
            info!("Verified contact address {contact_address}");
            Ok(true)
        } else {
            warn!("Passcode confirmed for {contact_address}, but it has no registration");
            Ok(false)
        }
    }

    /// Send a new passcode to an existing account, superseding any earlier one.
    pub async fn resend(
        db: &Database,
        mailer: &Mailer,
        otp_ttl: Duration,
        contact_address: &str,
    ) -> Result<()> {
        PhaseRecord::require(&Coll::from_db(db), Phase::Registration).await?;

        let contact_address = contact_address.trim();
        Account::require_exists(&Coll::from_db(db), contact_address).await?;

        let challenge = Challenge::new(contact_address, otp_ttl);
        mailer
            .dispatch(challenge.mail(RESEND_SUBJECT, otp_ttl))
            .await?;
        challenge.store(&Coll::from_db(db)).await?;

        info!("Reissued passcode for {contact_address}");
        Ok(())
    }

    /// All registrations, oldest first.
    pub async fn list(registrations: &Coll<Registration>) -> Result<Vec<Registration>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        Ok(registrations.find(None, options).await?.try_collect().await?)
    }

    /// Find the registration binding `identity_number` to `wallet_address`.
    ///
    /// Both inputs are compared in canonical form. Which of the two failed
    /// to match is never revealed.
    pub async fn find_for_vote(
        registrations: &Coll<Registration>,
        identity_number: &str,
        wallet_address: &str,
    ) -> Result<Registration> {
        let filter = doc! {
            "identity_number": identity_number.trim(),
            "wallet_address": WalletAddress::canonicalize(wallet_address),
        };
        registrations
            .find_one(filter, None)
            .await?
            .ok_or_else(|| Rejection::RegistrationNotFound.into())
    }
}
