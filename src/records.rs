//! Core record types for the log error collector
//!
//! This module defines the wire format returned by a server's `loglast`
//! endpoint and the normalized [`ErrorRecord`] that is stored and alerted on.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Number of characters of the remote `TS` field kept as the stored timestamp
pub const TIMESTAMP_WIDTH: usize = 19;

/// Maximum number of message characters forwarded in an alert
pub const ALERT_MESSAGE_LIMIT: usize = 100;

/// Number of elements in a `loglast` response array
pub const LOGLAST_SLOTS: usize = 4;

const RECENT_WARNING_SLOT: usize = 2;
const RECENT_ERROR_SLOT: usize = 3;

/// One log slot as reported by a server's `loglast` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    #[serde(rename = "TS")]
    pub ts: String,
    #[serde(rename = "Level")]
    pub level: String,
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line")]
    pub line: i64,
    #[serde(rename = "Msg")]
    pub msg: String,
}

/// Named view of a `loglast` response
///
/// The endpoint answers with a fixed-length array; only the two trailing
/// slots carry error payloads and either may be `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestLogs {
    /// Most recent warning (array position 2)
    pub recent_warning: Option<LogEntry>,
    /// Most recent error (array position 3)
    pub recent_error: Option<LogEntry>,
}

impl LatestLogs {
    /// Parse a `loglast` response body
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidJson` if the body is not JSON and
    /// `FetchError::UnexpectedShape` if it is not an array of exactly
    /// [`LOGLAST_SLOTS`] elements whose error slots are `null` or log entries.
    pub fn from_json(body: &str) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_str(body)?;
        let mut slots = match value {
            Value::Array(slots) => slots,
            other => {
                return Err(FetchError::UnexpectedShape(format!(
                    "expected a JSON array, got {}",
                    json_kind(&other)
                )));
            }
        };

        if slots.len() != LOGLAST_SLOTS {
            return Err(FetchError::UnexpectedShape(format!(
                "expected {} elements, got {}",
                LOGLAST_SLOTS,
                slots.len()
            )));
        }

        let recent_error = Self::parse_slot(&mut slots, RECENT_ERROR_SLOT)?;
        let recent_warning = Self::parse_slot(&mut slots, RECENT_WARNING_SLOT)?;

        Ok(Self {
            recent_warning,
            recent_error,
        })
    }

    fn parse_slot(slots: &mut [Value], index: usize) -> Result<Option<LogEntry>, FetchError> {
        let slot = slots[index].take();
        serde_json::from_value(slot)
            .map_err(|e| FetchError::UnexpectedShape(format!("slot {}: {}", index, e)))
    }

    /// Present entries in array order
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.recent_warning.iter().chain(self.recent_error.iter())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Keep at most `max_chars` characters of `text`
///
/// Counts characters rather than bytes so multi-byte text never splits.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Normalize a remote timestamp to second precision
pub fn normalize_timestamp(ts: &str) -> &str {
    truncate_chars(ts, TIMESTAMP_WIDTH)
}

/// One observed log error, keyed by `(server, timestamp)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Server address the error was fetched from
    pub server: String,
    /// Event time truncated to [`TIMESTAMP_WIDTH`] characters
    pub timestamp: String,
    /// Severity label such as `ERROR` or `WARN`
    pub level: String,
    /// Source file reported by the server
    pub file: String,
    /// Source line reported by the server
    pub line: i64,
    /// Full log message
    pub message: String,
}

impl ErrorRecord {
    /// Build a record from a remote log entry
    pub fn from_entry(server: &str, entry: &LogEntry) -> Self {
        Self {
            server: server.to_string(),
            timestamp: normalize_timestamp(&entry.ts).to_string(),
            level: entry.level.clone(),
            file: entry.file.clone(),
            line: entry.line,
            message: entry.msg.clone(),
        }
    }

    /// Text sent to the alert sink when this record is first seen
    pub fn alert_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.server,
            self.level,
            self.file,
            self.line,
            truncate_chars(&self.message, ALERT_MESSAGE_LIMIT)
        )
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}:{} {}",
            self.server, self.timestamp, self.level, self.file, self.line, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: &str, msg: &str) -> LogEntry {
        LogEntry {
            ts: ts.to_string(),
            level: "ERROR".to_string(),
            file: "hstore.go".to_string(),
            line: 321,
            msg: msg.to_string(),
        }
    }

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let record = ErrorRecord::from_entry("db1", &entry("2023-01-01T00:00:00.123Z", "boom"));
        assert_eq!(record.server, "db1");
        assert_eq!(record.timestamp, "2023-01-01T00:00:00");
    }

    #[test]
    fn test_short_timestamp_kept_whole() {
        assert_eq!(normalize_timestamp("2023-01-01"), "2023-01-01");
    }

    #[test]
    fn test_alert_text_truncates_message() {
        let long_message = "x".repeat(250);
        let record = ErrorRecord::from_entry("db1:7903", &entry("2023-01-01T00:00:00", &long_message));

        let text = record.alert_text();
        assert_eq!(
            text,
            format!("db1:7903 ERROR hstore.go 321 {}", "x".repeat(ALERT_MESSAGE_LIMIT))
        );
        // the stored message is untouched
        assert_eq!(record.message.len(), 250);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("短い", 10), "短い");
    }

    #[test]
    fn test_parse_both_slots_null() {
        let logs = LatestLogs::from_json(r#"[null, null, null, null]"#).unwrap();
        assert_eq!(logs, LatestLogs::default());
        assert_eq!(logs.entries().count(), 0);
    }

    #[test]
    fn test_parse_ignores_leading_slots() {
        let body = r#"[
            {"anything": 1},
            "ignored",
            {"TS": "2023-01-01T00:00:00.5+08:00", "Level": "WARN", "File": "a.go", "Line": 7, "Msg": "slow"},
            {"TS": "2023-01-02T00:00:00.5+08:00", "Level": "ERROR", "File": "b.go", "Line": 9, "Msg": "broken"}
        ]"#;
        let logs = LatestLogs::from_json(body).unwrap();

        let levels: Vec<&str> = logs.entries().map(|e| e.level.as_str()).collect();
        assert_eq!(levels, vec!["WARN", "ERROR"]);
        assert_eq!(logs.recent_error.unwrap().line, 9);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        for body in ["[]", "[null, null, null]", "[null, null, null, null, null]"] {
            match LatestLogs::from_json(body) {
                Err(FetchError::UnexpectedShape(msg)) => assert!(msg.contains("elements")),
                other => panic!("Expected UnexpectedShape for {}, got {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            LatestLogs::from_json(r#"{"TS": "x"}"#),
            Err(FetchError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            LatestLogs::from_json("<html>502 Bad Gateway</html>"),
            Err(FetchError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_slot() {
        let body = r#"[null, null, {"TS": "2023-01-01T00:00:00", "Level": "WARN"}, null]"#;
        match LatestLogs::from_json(body) {
            Err(FetchError::UnexpectedShape(msg)) => assert!(msg.starts_with("slot 2")),
            other => panic!("Expected UnexpectedShape, got {:?}", other),
        }
    }
}
