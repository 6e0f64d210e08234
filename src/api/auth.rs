use log::{info, warn};
use mongodb::bson::doc;
use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::{AuthToken, AUTH_TOKEN_COOKIE},
            response::MessageResponse,
        },
        db::admin::Admin,
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate, logout]
}

#[post("/adlogin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<MessageResponse>> {
    let with_username = doc! {
        "username": &credentials.username
    };

    let admin = admins.find_one(with_username, None).await?;
    let verified = match &admin {
        Some(admin) => admin.verify_password(&credentials.password)?,
        None => false,
    };
    let admin = match admin {
        Some(admin) if verified => admin,
        _ => {
            warn!("Failed admin login as '{}'", credentials.username);
            return Err(Error::Status(
                Status::Unauthorized,
                "No admin found with the provided username and password combination.".to_string(),
            ));
        }
    };

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config)?);
    info!("Admin '{}' logged in", admin.username);

    Ok(Json(MessageResponse::new("Login successful.")))
}

#[post("/adlogout")]
pub fn logout(cookies: &CookieJar) -> Json<MessageResponse> {
    cookies.remove(AUTH_TOKEN_COOKIE);
    Json(MessageResponse::new("Logged out."))
}
