#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, MailFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod model;

pub use config::Config;

/// Assemble the server. Configuration, the database connection and the mail
/// client are all set up by fairings when the rocket ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing::default())
        .attach(MailFairing)
}

/// Connect to the database named by `db_uri`.
#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to test database")
}

/// A fresh database name, so concurrently running tests never interfere.
#[cfg(test)]
fn database() -> String {
    use rand::Rng;
    format!("test{}", rand::thread_rng().gen::<u64>())
}

/// A rocket using the given database and mailer in place of the configured ones.
#[cfg(test)]
async fn rocket_for_db_and_mailer(
    db_client: mongodb::Client,
    db_name: &str,
    mailer: mail::Mailer,
) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing::with_client(db_client, db_name))
        .manage(mailer)
}
