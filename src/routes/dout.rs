use chrono::Duration;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use serde_json::{Value, json};

use crate::dout;
use crate::error::ControlError;
use crate::routes::error_response;
use crate::state::AppState;

/// Current DOUT1 state for a device. A device that never checked in reports
/// the default inactive state rather than 404.
#[get("/dout1_status/<imei>")]
pub async fn dout1_status(
    state: &State<AppState>,
    imei: &str,
) -> Result<Json<Value>, Custom<Json<Value>>> {
    let mut conn = state
        .db_pool
        .get()
        .map_err(|e| error_response("dout1_status", e.into()))?;

    let status = dout::current_status(&mut conn, imei)
        .map_err(|e| error_response("dout1_status", e))?;

    Ok(Json(json!({
        "imei": imei,
        "dout1_active": status.dout1_active,
        "deactivate_time": status.deactivate_time,
    })))
}

/// Engage or disengage DOUT1.
///
/// Body: `{"activate": bool, "ttl_seconds": int?}`. The TTL applies to
/// activation only and falls back to the configured default.
#[post("/dout1_control/<imei>", format = "json", data = "<body>")]
pub async fn dout1_control(
    state: &State<AppState>,
    imei: &str,
    body: Json<Value>,
) -> Result<Json<Value>, Custom<Json<Value>>> {
    if imei.trim().is_empty() {
        return Err(error_response(
            "dout1_control",
            ControlError::InvalidInput("missing IMEI".to_string()),
        ));
    }

    let Some(activate) = body.get("activate").and_then(Value::as_bool) else {
        log::warn!("invalid control input for IMEI {imei}");
        return Err(error_response(
            "dout1_control",
            ControlError::InvalidInput("missing or non-boolean `activate` field".to_string()),
        ));
    };

    let (strict, dedup, default_ttl) = {
        let settings = state.settings.read().unwrap();
        (
            settings.strict_device_existence,
            settings.dedup_commands,
            settings.default_ttl_seconds,
        )
    };

    let ttl_seconds = body
        .get("ttl_seconds")
        .and_then(Value::as_i64)
        .unwrap_or(default_ttl);
    if ttl_seconds <= 0 {
        return Err(error_response(
            "dout1_control",
            ControlError::InvalidInput(format!("ttl_seconds must be positive, got {ttl_seconds}")),
        ));
    }

    let mut conn = state
        .db_pool
        .get()
        .map_err(|e| error_response("dout1_control", e.into()))?;

    if strict {
        let known = dout::device_known(&mut conn, imei)
            .map_err(|e| error_response("dout1_control", e))?;
        if !known {
            log::warn!("IMEI {imei} not found in dout1_control");
            return Err(error_response(
                "dout1_control",
                ControlError::NotFound("IMEI not found".to_string()),
            ));
        }
    }

    let result = if activate {
        dout::activate(&mut conn, imei, Duration::seconds(ttl_seconds), dedup)
    } else {
        dout::deactivate(&mut conn, imei, dedup)
    };
    let cmd = result.map_err(|e| error_response("dout1_control", e))?;

    log::info!("manual command queued for IMEI {imei}: {}", cmd.command);
    Ok(Json(json!({ "command": cmd.command, "status": "queued" })))
}
