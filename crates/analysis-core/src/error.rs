use thiserror::Error;

/// Shared error taxonomy across the control plane's pure/compute crates.
/// Matches the validation/transient/permanent split in spec §7 at the type
/// level; `anyhow::Context` takes over at the application edge (scheduler
/// jobs, `main.rs`).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("calculation error: {0}")]
    CalculationError(String),

    #[error("bridge error: {0}")]
    BridgeError(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::DatabaseError(e.to_string())
    }
}
