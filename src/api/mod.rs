use rocket::Route;

pub mod account;
pub mod auth;
mod candidates;
mod phase;
mod registration;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(account::routes());
    routes.extend(auth::routes());
    routes.extend(registration::routes());
    routes.extend(candidates::routes());
    routes.extend(phase::routes());
    routes.extend(voting::routes());
    routes
}
