/// Per-server reconciliation of fetched errors against the store
pub mod report_engine;

pub use report_engine::{PassSummary, ReportEngine, ReportOutcome, ServerReport};
