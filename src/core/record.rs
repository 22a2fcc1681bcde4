//! Log record structure

use super::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source location of a logging call.
///
/// Resolved by the caller, either through `#[track_caller]` or the
/// `file!()`/`line!()` pair expanded by the logging macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
}

impl Location {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl LogRecord {
    /// Escape line breaks so that one record always renders as one line.
    fn sanitize_message(message: &str) -> String {
        if !message.contains(['\n', '\r', '\t']) {
            return message.to_string();
        }
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: Level, file: impl Into<String>, line: u32, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            file: file.into(),
            line,
            message: Self::sanitize_message(message),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
