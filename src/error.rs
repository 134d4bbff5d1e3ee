use thiserror::Error;

/// Errors surfaced by the command and actuator components.
///
/// `InvalidInput` and `NotFound` are client-attributable and carry a message
/// safe to return on the wire; storage and pool failures are logged with
/// context and reported generically.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("connection pool failure: {0}")]
    Pool(#[from] r2d2::Error),
}
