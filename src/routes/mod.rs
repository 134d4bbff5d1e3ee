use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Route, get, routes};
use serde_json::{Value, json};

use crate::error::ControlError;

pub mod commands;
pub mod dout;

/// API routes
pub fn api_routes() -> Vec<Route> {
    routes![
        welcome,
        // DOUT1 control
        dout::dout1_status,
        dout::dout1_control,
        // Command queue (transport poll path)
        commands::pending_commands,
        commands::update_command,
    ]
}

#[get("/")]
pub async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the douttrack command server" }))
}

/// Map a domain error onto the HTTP boundary.
///
/// Client errors carry their message; storage and pool failures are logged
/// with `context` and answered with a generic payload.
pub(crate) fn error_response(context: &str, err: ControlError) -> Custom<Json<Value>> {
    match err {
        ControlError::InvalidInput(msg) => Custom(Status::BadRequest, Json(json!({ "error": msg }))),
        ControlError::NotFound(msg) => Custom(Status::NotFound, Json(json!({ "error": msg }))),
        err @ (ControlError::Storage(_) | ControlError::Pool(_)) => {
            log::error!("{context}: {err}");
            Custom(
                Status::InternalServerError,
                Json(json!({ "error": "Server error" })),
            )
        }
    }
}
