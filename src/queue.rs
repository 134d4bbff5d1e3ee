//! Durable per-device command queue.
//!
//! Commands are an append-only log: rows are never deleted and only the
//! `status` column is ever updated, so the queue doubles as the audit trail
//! of every actuation the server has asked a device to perform.

use std::str::FromStr;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::ControlError;
use crate::models::{Command, NewCommand};

/// Delivery lifecycle of a queued command.
///
/// Transitions are not enforced: device acknowledgements can arrive out of
/// order relative to the transport's own status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    Sent,
    Acknowledged,
    Failed,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Sent => "sent",
            CommandStatus::Acknowledged => "acknowledged",
            CommandStatus::Failed => "failed",
        }
    }
}

impl FromStr for CommandStatus {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommandStatus::Pending),
            "sent" => Ok(CommandStatus::Sent),
            "acknowledged" => Ok(CommandStatus::Acknowledged),
            "failed" => Ok(CommandStatus::Failed),
            other => Err(ControlError::InvalidInput(format!(
                "unrecognized status `{other}`"
            ))),
        }
    }
}

/// Append a new pending command for a device.
///
/// Duplicate payloads are legal and retained; repeated activate requests are
/// expected to re-queue the same text.
pub fn enqueue(
    conn: &mut SqliteConnection,
    device_imei: &str,
    command_text: &str,
) -> Result<Command, ControlError> {
    use crate::schema::command_queue::dsl::*;

    let row = NewCommand::pending(device_imei, command_text);
    let inserted = diesel::insert_into(command_queue)
        .values(&row)
        .get_result::<Command>(conn)?;

    log::debug!(
        "queued command {} for IMEI {device_imei}: {command_text}",
        inserted.id
    );
    Ok(inserted)
}

/// Pending commands for a device, in creation order. Read-only.
pub fn list_pending(
    conn: &mut SqliteConnection,
    device_imei: &str,
) -> Result<Vec<Command>, ControlError> {
    use crate::schema::command_queue::dsl::*;

    command_queue
        .filter(imei.eq(device_imei))
        .filter(status.eq(CommandStatus::Pending.as_str()))
        .order(id.asc())
        .select(Command::as_select())
        .load::<Command>(conn)
        .map_err(Into::into)
}

/// Most recent pending command with an identical payload, if any.
/// Used by the de-duplication policy toggle.
pub fn find_pending_duplicate(
    conn: &mut SqliteConnection,
    device_imei: &str,
    command_text: &str,
) -> Result<Option<Command>, ControlError> {
    use crate::schema::command_queue::dsl::*;

    command_queue
        .filter(imei.eq(device_imei))
        .filter(command.eq(command_text))
        .filter(status.eq(CommandStatus::Pending.as_str()))
        .order(id.desc())
        .select(Command::as_select())
        .first::<Command>(conn)
        .optional()
        .map_err(Into::into)
}

/// Record a status reported by the transport or the device.
pub fn mark_status(
    conn: &mut SqliteConnection,
    command_id: i32,
    new_status: CommandStatus,
) -> Result<Command, ControlError> {
    use crate::schema::command_queue::dsl::*;

    let updated = diesel::update(command_queue.filter(id.eq(command_id)))
        .set(status.eq(new_status.as_str()))
        .execute(conn)?;

    if updated == 0 {
        return Err(ControlError::NotFound(format!(
            "command {command_id} not found"
        )));
    }

    command_queue
        .filter(id.eq(command_id))
        .select(Command::as_select())
        .first::<Command>(conn)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel_migrations::MigrationHarness;

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory db");
        conn.run_pending_migrations(crate::MIGRATIONS).expect("migrations");
        conn
    }

    #[test]
    fn enqueue_then_list_in_creation_order() {
        let mut conn = test_conn();
        enqueue(&mut conn, "868324021111111", "setdigout 1 3600").expect("enqueue");
        enqueue(&mut conn, "868324021111111", "setdigout 0").expect("enqueue");

        let pending = list_pending(&mut conn, "868324021111111").expect("list");
        let texts: Vec<&str> = pending.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(texts, ["setdigout 1 3600", "setdigout 0"]);
        assert!(pending.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn duplicate_payloads_are_retained() {
        let mut conn = test_conn();
        enqueue(&mut conn, "868324021111111", "setdigout 1 3600").expect("enqueue");
        enqueue(&mut conn, "868324021111111", "setdigout 1 3600").expect("enqueue");

        let pending = list_pending(&mut conn, "868324021111111").expect("list");
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn listing_is_scoped_to_the_device() {
        let mut conn = test_conn();
        enqueue(&mut conn, "868324021111111", "setdigout 0").expect("enqueue");
        enqueue(&mut conn, "868324022222222", "setdigout 0").expect("enqueue");

        let pending = list_pending(&mut conn, "868324021111111").expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].imei, "868324021111111");
    }

    #[test]
    fn mark_status_removes_command_from_pending() {
        let mut conn = test_conn();
        let cmd = enqueue(&mut conn, "868324021111111", "setdigout 0").expect("enqueue");

        let updated = mark_status(&mut conn, cmd.id, CommandStatus::Sent).expect("mark");
        assert_eq!(updated.status, "sent");
        assert!(list_pending(&mut conn, "868324021111111").expect("list").is_empty());
    }

    #[test]
    fn mark_status_accepts_out_of_order_transitions() {
        let mut conn = test_conn();
        let cmd = enqueue(&mut conn, "868324021111111", "setdigout 0").expect("enqueue");

        mark_status(&mut conn, cmd.id, CommandStatus::Acknowledged).expect("ack");
        let back = mark_status(&mut conn, cmd.id, CommandStatus::Sent).expect("sent");
        assert_eq!(back.status, "sent");
    }

    #[test]
    fn unknown_command_id_is_not_found() {
        let mut conn = test_conn();
        let err = mark_status(&mut conn, 4242, CommandStatus::Sent).unwrap_err();
        assert!(matches!(err, ControlError::NotFound(_)));
    }

    #[test]
    fn status_text_roundtrip() {
        for status in [
            CommandStatus::Pending,
            CommandStatus::Sent,
            CommandStatus::Acknowledged,
            CommandStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CommandStatus>().expect("parse"), status);
        }
        assert!("completed".parse::<CommandStatus>().is_err());
    }
}
