use std::ops::{Deref, DerefMut};

use log::info;
use mongodb::bson::doc;
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Rejection, Result};
use crate::model::{
    common::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
    mongodb::{errors::is_duplicate_key_error, Coll, Id},
};

/// An ordinary user account. The email doubles as the contact address
/// passcodes are sent to.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCore {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl AccountCore {
    /// Validate the signup fields and hash the password.
    pub fn new(name: &str, email: &str, password: &str) -> Result<Self> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::bad_request("All fields are required."));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
            )));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(verify_password(&self.password_hash, password)?)
    }
}

pub type NewAccount = AccountCore;

/// An account from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub account: AccountCore,
}

impl Account {
    /// Find the account with the given email, if any.
    pub async fn by_email(accounts: &Coll<Account>, email: &str) -> Result<Option<Account>> {
        Ok(accounts.find_one(doc! { "email": email.trim() }, None).await?)
    }

    /// Fail with [`Rejection::UnknownAccount`] unless an account exists for `email`.
    pub async fn require_exists(accounts: &Coll<Account>, email: &str) -> Result<()> {
        match Self::by_email(accounts, email).await? {
            Some(_) => Ok(()),
            None => Err(Rejection::UnknownAccount.into()),
        }
    }

    /// Create a new account.
    pub async fn sign_up(accounts: &Coll<NewAccount>, account: NewAccount) -> Result<()> {
        let email = account.email.clone();
        match accounts.insert_one(account, None).await {
            Ok(_) => {
                info!("Created account for {email}");
                Ok(())
            }
            Err(err) if is_duplicate_key_error(&err) => Err(Error::Status(
                Status::Conflict,
                "An account with this email already exists.".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Check the credentials of an existing account.
    pub async fn log_in(accounts: &Coll<Account>, email: &str, password: &str) -> Result<Account> {
        let account = Self::by_email(accounts, email)
            .await?
            .ok_or(Rejection::UnknownAccount)?;
        if account.verify_password(password)? {
            Ok(account)
        } else {
            Err(Error::Status(
                Status::Unauthorized,
                "Invalid credentials.".to_string(),
            ))
        }
    }
}

impl Deref for Account {
    type Target = AccountCore;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl DerefMut for Account {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.account
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_validation() {
        assert!(AccountCore::new("", "a@x.com", "long enough").is_err());
        assert!(AccountCore::new("Name", " ", "long enough").is_err());
        let short = AccountCore::new("Name", "a@x.com", "short").unwrap_err();
        assert_eq!(short.status(), Status::BadRequest);

        let account = AccountCore::new(" Name ", " a@x.com ", "long enough").unwrap();
        assert_eq!(account.name, "Name");
        assert_eq!(account.email, "a@x.com");
        assert_ne!(account.password_hash, "long enough");
    }

    #[backend_test]
    async fn sign_up_and_log_in(new_accounts: Coll<NewAccount>, accounts: Coll<Account>) {
        Account::sign_up(&new_accounts, NewAccount::example())
            .await
            .unwrap();

        let duplicate = Account::sign_up(&new_accounts, NewAccount::example())
            .await
            .unwrap_err();
        assert_eq!(duplicate.status(), Status::Conflict);

        let account = Account::log_in(&accounts, examples::EMAIL, examples::PASSWORD)
            .await
            .unwrap();
        assert_eq!(account.name, "Alice Example");

        let wrong = Account::log_in(&accounts, examples::EMAIL, "not the password")
            .await
            .unwrap_err();
        assert_eq!(wrong.status(), Status::Unauthorized);

        let unknown = Account::log_in(&accounts, examples::OTHER_EMAIL, examples::PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(unknown.status(), Status::NotFound);
    }
}
