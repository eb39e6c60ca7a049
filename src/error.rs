use thiserror::Error;

/// Errors raised by the error store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Error store is already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised while fetching or parsing a server's latest logs
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    BadStatus(u16),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Errors raised while resolving a cluster to its servers
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Failure during a collection pass
///
/// `Fetch` is recoverable at the per-server boundary; the others end the run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Errors that can occur when delivering an alert
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to send notification: {0}")]
    NotificationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
