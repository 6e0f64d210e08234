use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vote to cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub identity_number: String,
    pub wallet_address: String,
    pub candidate_id: u32,
}

/// Proof that a vote was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    /// Hex ID of the vote record.
    pub vote_id: String,
    pub candidate_id: u32,
    pub timestamp: DateTime<Utc>,
}

/// Reconciliation of one candidate's tally against the vote records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyAudit {
    pub candidate_id: u32,
    pub name: String,
    pub tally: u32,
    pub recorded_votes: u32,
    pub consistent: bool,
}

/// Whether an identity is a minor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorCheckRequest {
    pub identity_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinorCheckResponse {
    pub is_minor: bool,
    pub message: String,
}
