use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_sesv2::{
    config::{Credentials, Region},
    Client as SesClient,
};
use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::mail::{Mailer, SesMailer};
use crate::model::{
    db::{admin::ensure_admin_exists, identity::ensure_identities_seeded, identity::IdentitySeed},
    mongodb::{ensure_counter_exists, ensure_indexes_exist, Coll, CANDIDATE_ID_COUNTER_ID},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    otp_ttl: u32,
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of a passcode challenge in seconds.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Valid lifetime of admin auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
pub struct DbConfig {
    // non-secrets
    admin_username: String,
    #[serde(default)]
    identities: Vec<IdentitySeed>,
    // secrets
    db_uri: String,
    admin_password: String,
}

/// Perform the setup every database needs before serving requests:
/// indexes, the bootstrap admin, identity seed data and the candidate counter.
///
/// This operation is idempotent.
pub async fn prepare_database(db: &Database, config: &DbConfig) -> Result<()> {
    ensure_indexes_exist(db).await?;
    ensure_admin_exists(
        &Coll::from_db(db),
        &config.admin_username,
        &config.admin_password,
    )
    .await?;
    ensure_identities_seeded(&Coll::from_db(db), &config.identities).await?;
    ensure_counter_exists(&Coll::from_db(db), CANDIDATE_ID_COUNTER_ID, 1).await?;
    Ok(())
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
#[derive(Default)]
pub struct DatabaseFairing {
    /// Use this connection and database name instead of connecting via `db_uri`.
    preset: Option<(MongoClient, String)>,
}

impl DatabaseFairing {
    /// Use an existing connection and a specific database.
    pub fn with_client(client: MongoClient, db_name: &str) -> Self {
        Self {
            preset: Some((client, db_name.to_string())),
        }
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Construct the connection.
        let (client, db_name) = match &self.preset {
            Some((client, db_name)) => (client.clone(), db_name.clone()),
            None => {
                info!("Loaded database config, connecting...");
                match MongoClient::with_uri_str(&config.db_uri).await {
                    Ok(client) => (client, DATABASE.to_string()),
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };
        let db = client.database(&db_name);

        if let Err(e) = prepare_database(&db, &config).await {
            error!("Failed to prepare database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Name of the production database.
const DATABASE: &str = "vvm";

/// Configuration for the AWS connection.
#[derive(Deserialize)]
struct AwsConfig {
    // non-secrets
    aws_region: String,
    aws_access_key_id: String,
    mail_sender: String,
    // secrets
    aws_secret_access_key: String,
}

/// A fairing that loads the AWS config and places a [`Mailer`] backed by
/// Amazon SES into managed state.
pub struct MailFairing;

#[rocket::async_trait]
impl Fairing for MailFairing {
    fn info(&self) -> Info {
        Info {
            name: "AWS SES",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<AwsConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load AWS config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the connection.
        let aws_config = SdkConfig::builder()
            .region(Region::new(config.aws_region))
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                config.aws_access_key_id,
                config.aws_secret_access_key,
                None,
                None,
                "rocket config",
            )))
            .behavior_version(BehaviorVersion::latest())
            .build();
        let client = SesClient::new(&aws_config);
        info!("Loaded Amazon SES config");

        // Manage the state.
        rocket = rocket.manage(Mailer::new(SesMailer::new(client, config.mail_sender)));
        Ok(rocket)
    }
}
