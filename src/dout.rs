//! DOUT1 actuator state tracking.
//!
//! Every state change commits together with its queued command in a single
//! transaction, so a reader can never observe the output flagged active
//! without the matching engage command in the queue (or the reverse).

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::error::ControlError;
use crate::models::{Command, Dout1State, NewDout1State};
use crate::queue;

#[derive(Debug, Clone, Serialize)]
pub struct DoutStatus {
    pub dout1_active: bool,
    pub deactivate_time: Option<NaiveDateTime>,
}

/// Command the output on and arm the revert deadline at `now + ttl`.
///
/// The engage text carries the TTL in seconds, so the device-side timeout
/// and the server-side deadline stay in step.
pub fn activate(
    conn: &mut SqliteConnection,
    device_imei: &str,
    ttl: Duration,
    dedup: bool,
) -> Result<Command, ControlError> {
    let deadline = Utc::now().naive_utc() + ttl;
    let command_text = format!("setdigout 1 {}", ttl.num_seconds());
    apply(conn, device_imei, true, Some(deadline), &command_text, dedup)
}

/// Command the output off and clear the revert deadline.
///
/// A device with no prior state row gets one created with the output
/// inactive; the disengage command is queued either way, so the log reflects
/// exactly what was sent over the downlink.
pub fn deactivate(
    conn: &mut SqliteConnection,
    device_imei: &str,
    dedup: bool,
) -> Result<Command, ControlError> {
    apply(conn, device_imei, false, None, "setdigout 0", dedup)
}

/// Current actuator state; a device that was never activated reports
/// inactive with no deadline rather than an error.
pub fn current_status(
    conn: &mut SqliteConnection,
    device_imei: &str,
) -> Result<DoutStatus, ControlError> {
    use crate::schema::dout1_state::dsl::*;

    let row = dout1_state
        .filter(imei.eq(device_imei))
        .select(Dout1State::as_select())
        .first::<Dout1State>(conn)
        .optional()?;

    Ok(match row {
        Some(state) => DoutStatus {
            dout1_active: state.dout1_active,
            deactivate_time: state.deactivate_time,
        },
        None => DoutStatus {
            dout1_active: false,
            deactivate_time: None,
        },
    })
}

/// Whether the device has a state row. Only consulted by the gateway when
/// `strict_device_existence` is enabled.
pub fn device_known(
    conn: &mut SqliteConnection,
    device_imei: &str,
) -> Result<bool, ControlError> {
    use crate::schema::dout1_state::dsl::*;

    let row = dout1_state
        .filter(imei.eq(device_imei))
        .select(Dout1State::as_select())
        .first::<Dout1State>(conn)
        .optional()?;
    Ok(row.is_some())
}

fn apply(
    conn: &mut SqliteConnection,
    device_imei: &str,
    engage: bool,
    deadline: Option<NaiveDateTime>,
    command_text: &str,
    dedup: bool,
) -> Result<Command, ControlError> {
    conn.transaction::<_, ControlError, _>(|conn| {
        use crate::schema::dout1_state::dsl::*;

        diesel::insert_into(dout1_state)
            .values(&NewDout1State {
                imei: device_imei,
                dout1_active: engage,
                deactivate_time: deadline,
            })
            .on_conflict(imei)
            .do_update()
            .set((dout1_active.eq(engage), deactivate_time.eq(deadline)))
            .execute(conn)?;

        if dedup {
            if let Some(existing) = queue::find_pending_duplicate(conn, device_imei, command_text)? {
                log::debug!(
                    "suppressed duplicate of pending command {} for IMEI {device_imei}",
                    existing.id
                );
                return Ok(existing);
            }
        }

        queue::enqueue(conn, device_imei, command_text)
    })
}
