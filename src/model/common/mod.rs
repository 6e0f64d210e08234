//! Validated value types shared by the API and database layers.

pub mod code;
pub mod identity;
pub mod password;
pub mod phase;
pub mod wallet;
