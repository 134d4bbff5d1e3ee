use std::sync::{Arc, RwLock};

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::{Build, Rocket, launch};

mod codec12;
mod db;
mod dout;
mod error;
mod models;
mod queue;
mod routes;
mod schema;
mod settings;
mod state;
mod tasks;

use db::pool::{DbPool, init_pool};
use settings::ServerSettings;
use state::AppState;
use tasks::revert_sweeper::RevertSweeperFairing;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn build_rocket(pool: DbPool, settings: ServerSettings) -> Rocket<Build> {
    let app_state = AppState {
        db_pool: pool,
        settings: Arc::new(RwLock::new(settings)),
    };

    rocket::build()
        .manage(app_state)
        .mount("/", routes::api_routes())
}

#[launch]
fn rocket() -> _ {
    db::logger::init_logger();

    let pool = init_pool();
    let mut conn = pool.get().expect("Failed to get DB connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let settings = ServerSettings::load(&mut conn);
    settings
        .save(&mut conn)
        .expect("Failed to persist settings");
    drop(conn);
    log::info!("database ready, settings loaded");

    build_rocket(pool, settings).attach(RevertSweeperFairing)
}
