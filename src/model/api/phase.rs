use serde::{Deserialize, Serialize};

use crate::model::common::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResponse {
    pub phase: Phase,
}

/// The requested phase is kept raw so unrecognised values can be reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseUpdateRequest {
    pub new_phase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUpdateResponse {
    pub message: String,
    pub phase: Phase,
}
