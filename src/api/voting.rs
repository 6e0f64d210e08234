use mongodb::{Client, Database};
use rocket::{serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{
        auth::AuthToken,
        response::SuccessResponse,
        vote::{TallyAudit, VoteRequest},
    },
    db::{admin::Admin, vote::VoteRecord},
};

pub fn routes() -> Vec<Route> {
    routes![validate_user, audit]
}

/// Cast a vote.
#[post("/api/validateUser", data = "<request>", format = "json")]
async fn validate_user(
    request: Json<VoteRequest>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<Json<SuccessResponse>> {
    let receipt = VoteRecord::cast(db, db_client, &request).await?;
    Ok(Json(SuccessResponse::new(
        true,
        format!("Vote recorded with ID {}.", receipt.vote_id),
    )))
}

/// Compare every tally with the vote records.
#[get("/api/audit")]
async fn audit(
    _token: AuthToken<Admin>,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<Json<Vec<TallyAudit>>> {
    Ok(Json(VoteRecord::audit(db, db_client).await?))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::{self, json},
    };

    use super::*;
    use crate::api::testing::{register_example, set_phase};
    use crate::mail::testing::Outbox;
    use crate::model::{
        api::candidate::{CandidateDescription, CandidateSpec},
        common::{identity::examples as ids, phase::Phase, wallet::examples as wallets},
        db::{account::examples::EMAIL, registration::Registration},
        mongodb::Coll,
    };

    async fn add_candidate(client: &Client, spec: &CandidateSpec) -> u32 {
        let response = client
            .post("/addCandidate")
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let response = client.get("/getCandidates").dispatch().await;
        let listed: Vec<CandidateDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        listed
            .into_iter()
            .find(|candidate| candidate.name == spec.name)
            .unwrap()
            .id
    }

    async fn vote<'c>(client: &'c Client, wallet: &str, candidate_id: u32) -> LocalResponse<'c> {
        let body = json!({
            "identityNumber": ids::adult().to_string(),
            "walletAddress": wallet,
            "candidateId": candidate_id,
        })
        .to_string();
        client
            .post(uri!(validate_user))
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await
    }

    async fn tally(client: &Client, candidate_id: u32) -> u32 {
        let response = client.get("/getCandidates").dispatch().await;
        let listed: Vec<CandidateDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        listed
            .into_iter()
            .find(|candidate| candidate.id == candidate_id)
            .unwrap()
            .votes
    }

    /// Register, verify, open voting and return the ID of the one candidate.
    async fn ready_to_vote(client: &Client, db: &Database, outbox: &Outbox) -> u32 {
        let candidate_id = add_candidate(client, &CandidateSpec::example()).await;
        let code = register_example(client, db, outbox).await;
        let response = client
            .post("/verify-otp")
            .header(ContentType::JSON)
            .body(json!({ "contactAddress": EMAIL, "code": code }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        set_phase(client, Phase::Voting).await;
        candidate_id
    }

    #[backend_test(admin)]
    async fn example_scenario(client: Client, db: Database, outbox: Outbox) {
        let candidate_id = ready_to_vote(&client, &db, &outbox).await;

        let response = vote(&client, wallets::MIXED_CASE, candidate_id).await;
        assert_eq!(Status::Ok, response.status());
        let body: SuccessResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body.success);
        assert_eq!(tally(&client, candidate_id).await, 1);

        let registration = Coll::<Registration>::from_db(&db)
            .find_one(doc! { "identity_number": ids::adult().as_str() }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(registration.is_verified);
        assert!(registration.has_voted);

        let response = vote(&client, wallets::MIXED_CASE, candidate_id).await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(tally(&client, candidate_id).await, 1);

        let response = client.get(uri!(audit)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let audits: Vec<TallyAudit> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].tally, 1);
        assert!(audits[0].consistent);
    }

    #[backend_test(admin)]
    async fn concurrent_requests_vote_once(client: Client, db: Database, outbox: Outbox) {
        let first = ready_to_vote(&client, &db, &outbox).await;
        set_phase(&client, Phase::Registration).await;
        let second = add_candidate(&client, &CandidateSpec::example2()).await;
        set_phase(&client, Phase::Voting).await;

        let (response1, response2) = rocket::tokio::join!(
            vote(&client, wallets::MIXED_CASE, first),
            vote(&client, wallets::MIXED_CASE, second),
        );
        let mut statuses = vec![response1.status(), response2.status()];
        statuses.sort_by_key(|status| status.code);
        assert_eq!(statuses, vec![Status::Ok, Status::Conflict]);
        assert_eq!(tally(&client, first).await + tally(&client, second).await, 1);
    }

    #[backend_test(admin)]
    async fn voting_is_phase_gated(client: Client, db: Database, outbox: Outbox) {
        let candidate_id = ready_to_vote(&client, &db, &outbox).await;
        set_phase(&client, Phase::Result).await;

        let response = vote(&client, wallets::MIXED_CASE, candidate_id).await;
        assert_eq!(Status::Forbidden, response.status());
        assert_eq!(tally(&client, candidate_id).await, 0);
    }

    #[backend_test(admin)]
    async fn vote_failures(client: Client, db: Database, outbox: Outbox) {
        let candidate_id = ready_to_vote(&client, &db, &outbox).await;

        let response = vote(&client, wallets::OTHER, candidate_id).await;
        assert_eq!(Status::NotFound, response.status());

        let response = vote(&client, wallets::MIXED_CASE, candidate_id + 100).await;
        assert_eq!(Status::NotFound, response.status());

        // Neither failure used up the vote.
        let response = vote(&client, wallets::MIXED_CASE, candidate_id).await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn audit_requires_admin(client: Client) {
        let response = client.get(uri!(audit)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
