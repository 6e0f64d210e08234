use log::info;
use rocket::{http::Status, response::status::Custom, serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        account::{LoginRequest, SignupRequest},
        response::MessageResponse,
    },
    db::account::{Account, NewAccount},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![signup, login]
}

#[post("/signup", data = "<request>", format = "json")]
async fn signup(
    request: Json<SignupRequest>,
    accounts: Coll<NewAccount>,
) -> Result<Custom<Json<MessageResponse>>> {
    let account = NewAccount::new(&request.name, &request.email, &request.password)?;
    Account::sign_up(&accounts, account).await?;
    Ok(Custom(
        Status::Created,
        Json(MessageResponse::new("Account created successfully.")),
    ))
}

#[post("/login", data = "<request>", format = "json")]
async fn login(
    request: Json<LoginRequest>,
    accounts: Coll<Account>,
) -> Result<Json<MessageResponse>> {
    let account = Account::log_in(&accounts, &request.email, &request.password).await?;
    info!("{} logged in", account.email);
    Ok(Json(MessageResponse::new("Login successful.")))
}
