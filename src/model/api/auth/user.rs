use serde::de::DeserializeOwned;

use crate::model::{
    db::admin::Admin,
    mongodb::{Id, MongoCollection},
};

/// A kind of user that can hold an [`super::AuthToken`].
pub trait User: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// Distinguishes the tokens of different user kinds.
    const ROLE: &'static str;
    /// Get the user's ID.
    fn id(&self) -> Id;
}

impl User for Admin {
    const ROLE: &'static str = "admin";

    fn id(&self) -> Id {
        self.id
    }
}
