use thiserror::Error;

/// Startup-time failures. Nothing inside a cycle ever produces one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain a registry snapshot.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry returned HTTP {0}")]
    Status(u16),

    #[error("registry body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("registry snapshot is malformed: {0}")]
    Malformed(String),

    #[error("registry query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("registry read timed out")]
    Timeout,
}

/// Failure to deliver a single notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("delivery response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("delivery timed out")]
    Timeout,

    #[error("delivery task failed: {0}")]
    TaskFailed(String),
}
