/// SQLite-backed record of already reported errors
pub mod error_store;

pub use error_store::{ErrorStore, InsertOutcome, RecordStore};
