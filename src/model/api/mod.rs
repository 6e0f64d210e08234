//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Field names are camelCase.
//! - Object IDs are serialised as hex strings.

pub mod account;
pub mod admin;
pub mod auth;
pub mod candidate;
pub mod phase;
pub mod registration;
pub mod response;
pub mod vote;
