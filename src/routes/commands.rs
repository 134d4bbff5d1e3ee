use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use serde_json::{Value, json};

use crate::codec12;
use crate::error::ControlError;
use crate::queue::{self, CommandStatus};
use crate::routes::error_response;
use crate::state::AppState;

/// Pending commands for a device, oldest first, with the pre-encoded
/// downlink frame the transport can forward verbatim.
#[get("/command_queue/<imei>")]
pub async fn pending_commands(
    state: &State<AppState>,
    imei: &str,
) -> Result<Json<Value>, Custom<Json<Value>>> {
    let mut conn = state
        .db_pool
        .get()
        .map_err(|e| error_response("pending_commands", e.into()))?;

    let rows = queue::list_pending(&mut conn, imei)
        .map_err(|e| error_response("pending_commands", e))?;

    let commands: Vec<Value> = rows
        .iter()
        .map(|cmd| {
            let frame = match codec12::encode_downlink(&cmd.command) {
                Ok(frame) => Value::String(frame),
                Err(e) => {
                    log::warn!("could not encode frame for command {}: {e}", cmd.id);
                    Value::Null
                }
            };
            json!({ "id": cmd.id, "command": cmd.command, "frame": frame })
        })
        .collect();

    Ok(Json(json!({ "commands": commands })))
}

/// Record the delivery status the transport (or the device's response)
/// reported for a queued command.
#[post("/command_queue/update/<id>", format = "json", data = "<body>")]
pub async fn update_command(
    state: &State<AppState>,
    id: i32,
    body: Json<Value>,
) -> Result<Json<Value>, Custom<Json<Value>>> {
    let Some(status_text) = body.get("status").and_then(Value::as_str) else {
        return Err(error_response(
            "update_command",
            ControlError::InvalidInput("missing `status` field".to_string()),
        ));
    };
    let new_status: CommandStatus = status_text
        .parse()
        .map_err(|e| error_response("update_command", e))?;

    let mut conn = state
        .db_pool
        .get()
        .map_err(|e| error_response("update_command", e.into()))?;

    let cmd = queue::mark_status(&mut conn, id, new_status)
        .map_err(|e| error_response("update_command", e))?;

    log::info!("command {} for IMEI {} marked {}", cmd.id, cmd.imei, cmd.status);
    Ok(Json(json!({ "id": cmd.id, "status": cmd.status })))
}
