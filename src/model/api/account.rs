use serde::{Deserialize, Serialize};

/// Fields of the signup form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Fields of the login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::db::account::examples::{EMAIL, PASSWORD};

    impl SignupRequest {
        pub fn example() -> Self {
            Self {
                name: "Alice Example".into(),
                email: EMAIL.into(),
                password: PASSWORD.into(),
            }
        }
    }

    impl LoginRequest {
        pub fn example() -> Self {
            Self {
                email: EMAIL.into(),
                password: PASSWORD.into(),
            }
        }
    }
}
