use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::queue::CommandStatus;
use crate::schema::{command_queue, dout1_state};

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = command_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Command {
    pub id: i32,
    pub imei: String,
    pub command: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = command_queue)]
pub struct NewCommand<'a> {
    pub imei: &'a str,
    pub command: &'a str,
    pub status: &'a str,
    pub created_at: NaiveDateTime,
}

impl<'a> NewCommand<'a> {
    pub fn pending(imei: &'a str, command: &'a str) -> Self {
        Self {
            imei,
            command,
            status: CommandStatus::Pending.as_str(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = dout1_state)]
#[diesel(primary_key(imei))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Dout1State {
    pub imei: String,
    pub dout1_active: bool,
    pub deactivate_time: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dout1_state)]
pub struct NewDout1State<'a> {
    pub imei: &'a str,
    pub dout1_active: bool,
    pub deactivate_time: Option<NaiveDateTime>,
}
