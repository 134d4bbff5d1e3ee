//! Forced revert of DOUT1 engagements that outlived their deadline.
//!
//! The sweep itself is a plain re-entrant function; scheduling lives in the
//! fairing so the interval can change at runtime and tests can drive the
//! sweep with a pinned clock.

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Build, Rocket, tokio};

use crate::dout;
use crate::error::ControlError;
use crate::models::Dout1State;
use crate::state::AppState;

/// Revert every device whose engagement deadline has passed.
///
/// Each device is handled independently: a storage failure on one is logged
/// and the rest still get their revert, with the failed one retried on the
/// next scheduled run. Running twice in a row is a no-op the second time,
/// since the selection re-reads the committed state.
pub fn sweep_expired(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<usize, ControlError> {
    use crate::schema::dout1_state::dsl::*;

    let expired = dout1_state
        .filter(dout1_active.eq(true))
        .filter(deactivate_time.le(now))
        .select(Dout1State::as_select())
        .load::<Dout1State>(conn)?;

    let mut reverted = 0;
    for entry in expired {
        let deadline = entry
            .deactivate_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        match dout::deactivate(conn, &entry.imei, false) {
            Ok(cmd) => {
                log::info!(
                    "forced DOUT1 off for IMEI {} (deadline {deadline} passed): queued `{}`",
                    entry.imei,
                    cmd.command
                );
                reverted += 1;
            }
            Err(e) => {
                log::error!("failed to revert DOUT1 for IMEI {}: {e}", entry.imei);
            }
        }
    }

    Ok(reverted)
}

/// Spawns the periodic sweep loop at ignition.
pub struct RevertSweeperFairing;

#[rocket::async_trait]
impl Fairing for RevertSweeperFairing {
    fn info(&self) -> Info {
        Info {
            name: "DOUT1 revert sweeper",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let state = rocket.state::<AppState>().expect("AppState not managed");
        let pool = state.db_pool.clone();
        let settings = state.settings.clone();

        tokio::spawn(async move {
            loop {
                let interval = settings
                    .read()
                    .map(|s| s.sweep_interval_seconds.max(1))
                    .unwrap_or(60) as u64;

                tokio::time::sleep(Duration::from_secs(interval)).await;

                let pool = pool.clone();
                let _ = tokio::task::spawn_blocking(move || {
                    let mut conn = match pool.get() {
                        Ok(conn) => conn,
                        Err(e) => {
                            log::error!("revert sweeper could not reach the pool: {e}");
                            return;
                        }
                    };
                    if let Err(e) = sweep_expired(&mut conn, Utc::now().naive_utc()) {
                        log::error!("revert sweep failed, retrying next tick: {e}");
                    }
                })
                .await;
            }
        });

        Ok(rocket)
    }
}
