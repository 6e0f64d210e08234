pub mod account;
pub mod admin;
pub mod candidate;
pub mod challenge;
pub mod identity;
pub mod phase;
pub mod registration;
pub mod vote;
