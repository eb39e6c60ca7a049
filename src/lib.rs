/// Error types for the log error collector
pub mod error;

/// Wire format and stored record types
pub mod records;

/// Fetching the latest errors from a server
pub mod collectors;

/// Persisted record of already reported errors
pub mod store;

/// Cluster to server resolution
pub mod directory;

/// Per-server reconciliation and collection passes
pub mod report;

/// Alert sinks and rate limiting
pub mod alerts;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{AlertError, ConfigError, DirectoryError, FetchError, ReportError, StoreError};
pub use records::{ErrorRecord, LatestLogs, LogEntry};
