use mongodb::Database;
use rocket::{http::Status, response::status::Custom, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        candidate::{CandidateDescription, CandidateSpec},
        response::MessageResponse,
    },
    db::{admin::Admin, candidate::Candidate},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![add_candidate, get_candidates, get_candidates_alias, result_candidates]
}

#[post("/addCandidate", data = "<spec>", format = "json")]
async fn add_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    db: &State<Database>,
) -> Result<Custom<Json<MessageResponse>>> {
    let candidate = Candidate::add(db, spec.into_inner()).await?;
    Ok(Custom(
        Status::Created,
        Json(MessageResponse::new(format!(
            "Candidate '{}' added with ID {}.",
            candidate.name, candidate.id
        ))),
    ))
}

#[get("/getCandidates")]
async fn get_candidates(candidates: Coll<Candidate>) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = Candidate::list(&candidates).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[get("/api/candidate")]
async fn get_candidates_alias(
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    get_candidates(candidates).await
}

/// Candidates by descending tally. Final once the election is in the result phase.
#[get("/resultcandidates")]
async fn result_candidates(
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = Candidate::ranked(&candidates).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}
