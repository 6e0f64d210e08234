use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::registration::{Registration, RegistrationOutcome};

/// A request to register an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub identity_number: String,
    pub wallet_address: String,
    pub contact_address: String,
}

/// Where the registrant goes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub redirect: String,
}

impl From<RegistrationOutcome> for RegisterResponse {
    fn from(outcome: RegistrationOutcome) -> Self {
        Self {
            message: outcome.message().to_string(),
            redirect: outcome.redirect().to_string(),
        }
    }
}

/// A passcode entered by the registrant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub contact_address: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub contact_address: String,
}

/// A registration as shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDescription {
    pub id: String,
    pub identity_number: String,
    pub contact_address: String,
    pub wallet_address: String,
    pub is_verified: bool,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationDescription {
    fn from(registration: Registration) -> Self {
        let id = registration.id.to_string();
        let core = registration.registration;
        Self {
            id,
            identity_number: core.identity_number.into(),
            contact_address: core.contact_address,
            wallet_address: core.wallet_address.into(),
            is_verified: core.is_verified,
            has_voted: core.has_voted,
            created_at: core.created_at,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::common::{identity::examples::adult, wallet::examples::MIXED_CASE};
    use crate::model::db::account::examples::EMAIL;

    impl RegisterRequest {
        /// The adult identity, a mixed-case wallet, and the example account's email.
        pub fn example() -> Self {
            Self {
                identity_number: adult().to_string(),
                wallet_address: MIXED_CASE.to_string(),
                contact_address: EMAIL.to_string(),
            }
        }
    }
}
