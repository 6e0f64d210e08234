use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        phase::{PhaseResponse, PhaseUpdateRequest, PhaseUpdateResponse},
    },
    common::phase::Phase,
    db::{admin::Admin, phase::PhaseRecord},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![current_phase, update_phase]
}

#[get("/api/currentPhase")]
async fn current_phase(records: Coll<PhaseRecord>) -> Result<Json<PhaseResponse>> {
    let phase = PhaseRecord::current(&records).await?;
    Ok(Json(PhaseResponse { phase }))
}

#[post("/api/updatePhase", data = "<request>", format = "json")]
async fn update_phase(
    _token: AuthToken<Admin>,
    request: Json<PhaseUpdateRequest>,
    records: Coll<PhaseRecord>,
) -> Result<Json<PhaseUpdateResponse>> {
    let phase: Phase = request.new_phase.trim().parse()?;
    let phase = PhaseRecord::set(&records, phase).await?;
    Ok(Json(PhaseUpdateResponse {
        message: format!("Phase updated to {phase}."),
        phase,
    }))
}
