use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    figment::Figment,
    http::uri::Origin,
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{db::role::ensure_admin_exists, mongodb::ensure_indexes_exist};

/// Base path used when none is configured.
pub const DEFAULT_BASE_PATH: &str = "/";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// The path the API is mounted under, e.g. `/` locally or `/voting` behind
/// a shared host. Configured via `base_path` / `ROCKET_BASE_PATH`.
///
/// Anything that is not a static origin path (no query, no dynamic
/// `<params>`) is ignored with a warning, since mounting it would panic.
pub fn base_path(figment: &Figment) -> String {
    match figment.extract_inner::<String>("base_path") {
        Ok(path) if is_static_path(&path) => path,
        Ok(path) => {
            warn!("Ignoring base path {path:?}: it must be a static path starting with '/'");
            DEFAULT_BASE_PATH.to_string()
        }
        Err(_) => DEFAULT_BASE_PATH.to_string(),
    }
}

fn is_static_path(path: &str) -> bool {
    match Origin::parse(path) {
        Ok(origin) => {
            path.starts_with('/')
                && origin.query().is_none()
                && !path.contains('<')
                && !path.contains('>')
        }
        Err(_) => false,
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
struct DbConfig {
    // non-secrets
    default_admin_email: String,
    // secrets
    db_uri: String,
    default_admin_password: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

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
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }

        // Ensure there is at least one administrator.
        if let Err(e) = ensure_admin_exists(
            &db,
            &config.default_admin_email,
            &config.default_admin_password,
        )
        .await
        {
            error!("Failed to bootstrap default administrator: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Name of the production database.
const DATABASE: &str = "voting";
