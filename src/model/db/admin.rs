use std::ops::{Deref, DerefMut};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::password::{hash_password, verify_password},
    mongodb::{Coll, Id},
};

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Create an admin, hashing the given password.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(verify_password(&self.password_hash, password)?)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Create the bootstrap admin if there are no admins at all.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>, username: &str, password: &str) -> Result<()> {
    if admins.count_documents(None, None).await? == 0 {
        admins
            .insert_one(NewAdmin::new(username, password)?, None)
            .await?;
        info!("Created bootstrap admin '{username}'");
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCore {
        pub fn example() -> Self {
            Self::new("coordinator", "coordinator-password").unwrap()
        }
    }
}
