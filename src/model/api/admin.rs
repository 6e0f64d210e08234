use serde::{Deserialize, Serialize};

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        /// Matches [`crate::model::db::admin::NewAdmin::example`].
        pub fn example() -> Self {
            Self {
                username: "coordinator".into(),
                password: "coordinator-password".into(),
            }
        }

        pub fn wrong_password() -> Self {
            Self {
                password: "not-the-password".into(),
                ..Self::example()
            }
        }
    }
}
