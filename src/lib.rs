#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Assemble the server: routes under the configured base path, plus the
/// fairings that load configuration and connect to the database at ignition.
pub fn build() -> Rocket<Build> {
    let rocket = rocket::build();
    let base_path = config::base_path(rocket.figment());
    info!("Mounting API under {base_path}");
    rocket
        .mount(base_path, api::routes())
        .attach(logging::LoggerFairing)
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
}

/// Build a test server around an existing database connection.
/// Routes are always mounted at the root so that `uri!` works in tests.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes on test database");
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .manage(client)
        .manage(db)
}

/// Connect to the database named by `db_uri` in the test configuration.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .unwrap_or_else(|_| panic!("Could not connect to database with `db_uri` \"{db_uri}\""))
}

/// A fresh database name per test, to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}
