use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Remote classifier timed out: {0}")]
    RemoteTimeout(String),

    #[error("Remote classifier unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("Remote classifier returned an invalid response: {0}")]
    RemoteInvalidResponse(String),

    #[error("Storage quota exceeded: {0}")]
    StorageQuotaExceeded(String),

    #[error("Message delivery failed: {0}")]
    MessageDeliveryFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for GuardError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DiskFull) => GuardError::StorageQuotaExceeded(e.to_string()),
            _ => GuardError::Database(e.to_string()),
        }
    }
}
