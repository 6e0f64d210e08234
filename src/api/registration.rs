use mongodb::{Client, Database};
use rocket::{serde::json::Json, Route, State};

use crate::error::{Rejection, Result};
use crate::mail::Mailer;
use crate::model::{
    api::{
        auth::AuthToken,
        registration::{
            RegisterRequest, RegisterResponse, RegistrationDescription, ResendRequest,
            VerifyRequest,
        },
        response::{MessageResponse, SuccessResponse},
        vote::{MinorCheckRequest, MinorCheckResponse},
    },
    common::identity::IdentityNumber,
    db::{admin::Admin, identity::check_eligibility, registration::Registration},
    mongodb::Coll,
};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![
        register,
        verify_otp,
        resend_otp,
        registered_users,
        check_is_minor,
    ]
}

#[post("/register", data = "<request>", format = "json")]
async fn register(
    request: Json<RegisterRequest>,
    db: &State<Database>,
    db_client: &State<Client>,
    mailer: &State<Mailer>,
    config: &State<Config>,
) -> Result<Json<RegisterResponse>> {
    let outcome =
        Registration::register(db, db_client, mailer, config.otp_ttl(), &request).await?;
    Ok(Json(outcome.into()))
}

#[post("/verify-otp", data = "<request>", format = "json")]
async fn verify_otp(
    request: Json<VerifyRequest>,
    db: &State<Database>,
) -> Result<Json<SuccessResponse>> {
    let verified = Registration::confirm(db, &request.contact_address, &request.code).await?;
    let response = if verified {
        SuccessResponse::new(true, "Email verified successfully.")
    } else {
        SuccessResponse::new(false, "No registration uses this contact address.")
    };
    Ok(Json(response))
}

#[post("/resend-otp", data = "<request>", format = "json")]
async fn resend_otp(
    request: Json<ResendRequest>,
    db: &State<Database>,
    mailer: &State<Mailer>,
    config: &State<Config>,
) -> Result<Json<MessageResponse>> {
    Registration::resend(db, mailer, config.otp_ttl(), &request.contact_address).await?;
    Ok(Json(MessageResponse::new("New OTP sent to your email.")))
}

#[get("/getRegisteredUsers")]
async fn registered_users(
    _token: AuthToken<Admin>,
    registrations: Coll<Registration>,
) -> Result<Json<Vec<RegistrationDescription>>> {
    let registrations = Registration::list(&registrations).await?;
    Ok(Json(registrations.into_iter().map(Into::into).collect()))
}

#[post("/api/checkIsMinor", data = "<request>", format = "json")]
async fn check_is_minor(
    request: Json<MinorCheckRequest>,
    db: &State<Database>,
) -> Result<Json<MinorCheckResponse>> {
    let number: IdentityNumber = request
        .identity_number
        .trim()
        .parse()
        .map_err(|_| Rejection::UnknownIdentity)?;
    let eligibility = check_eligibility(db, &number).await?;
    let message = if eligibility.minor {
        "This identity belongs to a minor and is not eligible to vote."
    } else {
        "This identity is eligible to vote."
    };
    Ok(Json(MinorCheckResponse {
        is_minor: eligibility.minor,
        message: message.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use super::*;
    use crate::api::testing::register_example;
    use crate::mail::testing::Outbox;
    use crate::model::common::{identity::examples as ids, wallet::examples as wallets};
    use crate::model::db::{
        account::{examples::EMAIL, NewAccount},
        challenge::Challenge,
    };

    async fn verify_status(client: &Client, code: &str) -> (Status, Option<SuccessResponse>) {
        let response = client
            .post(uri!(verify_otp))
            .header(ContentType::JSON)
            .body(json!({ "contactAddress": EMAIL, "code": code }).to_string())
            .dispatch()
            .await;
        let status = response.status();
        let body = response.into_string().await.unwrap_or_default();
        (status, serde_json::from_str(&body).ok())
    }

    #[backend_test]
    async fn register_and_verify(client: Client, db: Database, outbox: Outbox) {
        let code = register_example(&client, &db, &outbox).await;

        let (status, body) = verify_status(&client, &code).await;
        assert_eq!(Status::Ok, status);
        assert!(body.unwrap().success);

        let registration = Coll::<Registration>::from_db(&db)
            .find_one(doc! { "contact_address": EMAIL }, None)
            .await
            .unwrap()
            .unwrap();
        assert!(registration.is_verified);

        // The passcode was single use.
        let (status, body) = verify_status(&client, &code).await;
        assert_eq!(Status::BadRequest, status);
        assert!(!body.unwrap().success);
    }

    #[backend_test]
    async fn register_response_shape(client: Client, db: Database) {
        Coll::<NewAccount>::from_db(&db)
            .insert_one(NewAccount::example(), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        let body: RegisterResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.redirect, "emailverify.html");
        assert_eq!(body.message, "OTP sent. Please verify.");

        // Minors are redirected, not refused.
        let mut request = RegisterRequest::example();
        request.identity_number = ids::minor().to_string();
        request.wallet_address = wallets::OTHER.to_string();
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: RegisterResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.redirect, "checkage.html");
    }

    #[backend_test]
    async fn register_failures(client: Client, db: Database, registrations: Coll<Registration>) {
        Coll::<NewAccount>::from_db(&db)
            .insert_one(NewAccount::example(), None)
            .await
            .unwrap();
        let register_status = |request: RegisterRequest| {
            let client = &client;
            async move {
                let response = client
                    .post(uri!(register))
                    .header(ContentType::JSON)
                    .body(json!(request).to_string())
                    .dispatch()
                    .await;
                let status = response.status();
                let body = response.into_string().await.unwrap();
                assert!(body.contains("\"success\":false"));
                status
            }
        };

        let mut request = RegisterRequest::example();
        request.identity_number = ids::unknown().to_string();
        assert_eq!(Status::NotFound, register_status(request).await);

        let mut request = RegisterRequest::example();
        request.wallet_address = format!("0x{}", "Z".repeat(40));
        assert_eq!(Status::BadRequest, register_status(request).await);

        let mut request = RegisterRequest::example();
        request.contact_address = "nobody@x.com".to_string();
        assert_eq!(Status::NotFound, register_status(request).await);

        assert_eq!(registrations.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(mail_down)]
    async fn mail_failure_is_reported(client: Client, db: Database, registrations: Coll<Registration>) {
        Coll::<NewAccount>::from_db(&db)
            .insert_one(NewAccount::example(), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegisterRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadGateway, response.status());
        assert_eq!(registrations.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn resend_replaces_code(client: Client, db: Database, outbox: Outbox) {
        let first = register_example(&client, &db, &outbox).await;

        let response = client
            .post(uri!(resend_otp))
            .header(ContentType::JSON)
            .body(json!({ "contactAddress": EMAIL }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(outbox.mails().len(), 2);

        let second = Coll::<Challenge>::from_db(&db)
            .find_one(doc! { "_id": EMAIL }, None)
            .await
            .unwrap()
            .unwrap()
            .code
            .to_string();
        if first != second {
            let (status, _) = verify_status(&client, &first).await;
            assert_eq!(Status::Unauthorized, status);
        }
        let (status, _) = verify_status(&client, &second).await;
        assert_eq!(Status::Ok, status);

        let response = client
            .post(uri!(resend_otp))
            .header(ContentType::JSON)
            .body(json!({ "contactAddress": "nobody@x.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn registered_users_requires_admin(client: Client) {
        let response = client.get(uri!(registered_users)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(admin)]
    async fn registered_users_listed(client: Client, db: Database, outbox: Outbox) {
        register_example(&client, &db, &outbox).await;

        let response = client.get(uri!(registered_users)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let listed: Vec<RegistrationDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].identity_number, ids::adult().to_string());
        assert!(!listed[0].is_verified);
        assert!(!listed[0].has_voted);
    }

    #[backend_test]
    async fn minor_check(client: Client) {
        for (number, minor) in [(ids::adult(), false), (ids::minor(), true)] {
            let response = client
                .post(uri!(check_is_minor))
                .header(ContentType::JSON)
                .body(json!({ "identityNumber": number.to_string() }).to_string())
                .dispatch()
                .await;
            assert_eq!(Status::Ok, response.status());
            let body: MinorCheckResponse =
                serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
            assert_eq!(body.is_minor, minor);
        }

        let response = client
            .post(uri!(check_is_minor))
            .header(ContentType::JSON)
            .body(json!({ "identityNumber": ids::unknown().to_string() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
