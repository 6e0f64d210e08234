use std::ops::Deref;
use std::time::Duration;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    account::{Account, NewAccount},
    admin::{Admin, NewAdmin},
    candidate::Candidate,
    challenge::Challenge,
    identity::Identity,
    phase::PhaseRecord,
    registration::{NewRegistration, Registration},
    vote::{NewVoteRecord, VoteRecord},
};

use super::counter::Counter;

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

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
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

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<&State<Database>>().await {
            request::Outcome::Success(db) => request::Outcome::Success(Coll::from_db(db)),
            _ => request::Outcome::Error((Status::InternalServerError, ())),
        }
    }
}

// Account collections
const ACCOUNTS: &str = "accounts";
impl MongoCollection for Account {
    const NAME: &'static str = ACCOUNTS;
}
impl MongoCollection for NewAccount {
    const NAME: &'static str = ACCOUNTS;
}

// Admin collections
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Identity collection
impl MongoCollection for Identity {
    const NAME: &'static str = "identities";
}

// Challenge collection
impl MongoCollection for Challenge {
    const NAME: &'static str = "challenges";
}

// Registration collections
const REGISTRATIONS: &str = "registrations";
impl MongoCollection for Registration {
    const NAME: &'static str = REGISTRATIONS;
}
impl MongoCollection for NewRegistration {
    const NAME: &'static str = REGISTRATIONS;
}

// Candidate collection
impl MongoCollection for Candidate {
    const NAME: &'static str = "candidates";
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for VoteRecord {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVoteRecord {
    const NAME: &'static str = VOTES;
}

// Phase collection
impl MongoCollection for PhaseRecord {
    const NAME: &'static str = "phase";
}

// Counter collection
impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Account collection.
    let account_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Account>::from_db(db)
        .create_index(account_index, None)
        .await?;

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // Registration collection: one registration per identity and per wallet.
    let registrations = Coll::<Registration>::from_db(db);
    let identity_index = IndexModel::builder()
        .keys(doc! {"identity_number": 1})
        .options(unique.clone())
        .build();
    registrations.create_index(identity_index, None).await?;
    let wallet_index = IndexModel::builder()
        .keys(doc! {"wallet_address": 1})
        .options(unique.clone())
        .build();
    registrations.create_index(wallet_index, None).await?;
    let contact_index = IndexModel::builder()
        .keys(doc! {"contact_address": 1})
        .build();
    registrations.create_index(contact_index, None).await?;

    // Challenge collection: reclaim storage once a challenge has expired.
    // Liveness is always checked on read, this is only garbage collection.
    let expiry_index = IndexModel::builder()
        .keys(doc! {"expire_at": 1})
        .options(
            IndexOptions::builder()
                .expire_after(Duration::from_secs(0))
                .build(),
        )
        .build();
    Coll::<Challenge>::from_db(db)
        .create_index(expiry_index, None)
        .await?;

    // Vote collection: at most one vote record per identity.
    let votes = Coll::<VoteRecord>::from_db(db);
    let voter_index = IndexModel::builder()
        .keys(doc! {"identity_number": 1})
        .options(unique)
        .build();
    votes.create_index(voter_index, None).await?;
    let candidate_index = IndexModel::builder()
        .keys(doc! {"candidate_id": 1})
        .build();
    votes.create_index(candidate_index, None).await?;

    Ok(())
}
