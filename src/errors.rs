use thiserror::Error;
use uuid::Uuid;

/// Error type shared by storage, configuration and the core services.
#[derive(Debug, Error)]
pub enum PgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Guest not found: {0}")]
    GuestNotFound(Uuid),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, PgError>;
