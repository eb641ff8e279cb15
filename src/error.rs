use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("libSQL error: {0}")]
    Libsql(#[from] libsql::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Queue publish failed: {0}")]
    Queue(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// Failure of a single SMS send. Recovered by the dispatcher through the
/// retry queue; never aborts a batch.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to sign provider token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("unrecognised test date '{0}'")]
    InvalidTestDate(String),
}
