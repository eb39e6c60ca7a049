/// HTTP fetcher for a server's most recent log errors
pub mod log_fetcher;

pub use log_fetcher::{HttpLogFetcher, LogSource};
#[cfg(test)]
pub use log_fetcher::MockLogSource;
