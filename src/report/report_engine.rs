use crate::alerts::AlertSink;
use crate::collectors::LogSource;
use crate::directory::ServerDirectory;
use crate::error::{FetchError, ReportError, StoreError};
use crate::records::{ErrorRecord, LogEntry};
use crate::store::{InsertOutcome, RecordStore};
use log::{debug, error, info, warn};
use std::fmt;

/// What happened to a single fetched log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// First sighting: stored and alerted
    New,
    /// Already stored: skipped
    Duplicate,
}

/// Counts for one successfully checked server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerReport {
    pub new_errors: usize,
    pub duplicates: usize,
}

/// Counts for one collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Servers visited, failed ones included
    pub servers: usize,
    pub new_errors: usize,
    pub duplicates: usize,
    /// Servers whose logs could not be fetched or parsed
    pub failed: usize,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} servers checked, {} new errors, {} already reported, {} failed",
            self.servers, self.new_errors, self.duplicates, self.failed
        )
    }
}

/// Reconciles each server's latest errors against the error store
///
/// Servers are processed one at a time. A fetch failure only aborts the
/// server it happened on and is reported through the alert sink; store
/// failures abort the whole pass.
pub struct ReportEngine<'a> {
    store: &'a dyn RecordStore,
    source: &'a dyn LogSource,
    sink: &'a dyn AlertSink,
}

impl<'a> ReportEngine<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        source: &'a dyn LogSource,
        sink: &'a dyn AlertSink,
    ) -> Self {
        Self {
            store,
            source,
            sink,
        }
    }

    /// Store and alert on `entry` unless its key has been seen before
    pub fn report_error(&self, server: &str, entry: &LogEntry) -> Result<ReportOutcome, StoreError> {
        let record = ErrorRecord::from_entry(server, entry);

        if self.store.exists(&record.server, &record.timestamp)? {
            debug!("{} {} exist", record.server, record.timestamp);
            return Ok(ReportOutcome::Duplicate);
        }

        match self.store.insert(&record)? {
            InsertOutcome::Inserted => {
                warn!("{} {} added", record.server, record.timestamp);
                self.sink.notify(&record.alert_text());
                Ok(ReportOutcome::New)
            }
            InsertOutcome::Duplicate => {
                // another run stored it between the check and the insert
                debug!("{} {} exist", record.server, record.timestamp);
                Ok(ReportOutcome::Duplicate)
            }
        }
    }

    /// Fetch one server's latest logs and reconcile each present entry
    pub async fn check_server(&self, server: &str) -> Result<ServerReport, ReportError> {
        let logs = self.source.fetch_latest(server).await?;

        let mut report = ServerReport::default();
        for entry in logs.entries() {
            match self.report_error(server, entry)? {
                ReportOutcome::New => report.new_errors += 1,
                ReportOutcome::Duplicate => report.duplicates += 1,
            }
        }

        Ok(report)
    }

    fn report_failure(&self, server: &str, err: &FetchError) {
        error!("{} fail: {}", server, err);
        self.sink.notify(&format!("{} {}", server, err));
    }

    /// Run one collection pass over `servers` in order
    ///
    /// # Errors
    ///
    /// Fetch failures are reported and counted in the summary; any other
    /// error ends the pass.
    pub async fn run_pass(&self, servers: &[String]) -> Result<PassSummary, ReportError> {
        let mut summary = PassSummary::default();

        for server in servers {
            summary.servers += 1;
            match self.check_server(server).await {
                Ok(report) => {
                    summary.new_errors += report.new_errors;
                    summary.duplicates += report.duplicates;
                }
                Err(ReportError::Fetch(e)) => {
                    self.report_failure(server, &e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!("Collection pass finished: {}", summary);
        Ok(summary)
    }

    /// Resolve `cluster` through `directory` and run one pass over it
    pub async fn run_cluster(
        &self,
        directory: &dyn ServerDirectory,
        cluster: &str,
    ) -> Result<PassSummary, ReportError> {
        let servers = directory.resolve(cluster)?;
        info!("Checking {} servers in cluster {}", servers.len(), cluster);
        self.run_pass(&servers).await
    }
}
