//! Diagnostic side-channel
//!
//! Faults inside the logging system cannot be reported through the logging
//! system itself. They go here instead: by default to standard error, or to a
//! user supplied callback.

use super::error::wrap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Callback type for diagnostic lines
///
/// Called once per diagnostic line, without a trailing newline.
pub type DiagnosticCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Diagnostics {
    callback: Option<DiagnosticCallback>,
}

impl Diagnostics {
    /// Diagnostics written to standard error.
    pub fn stderr() -> Self {
        Self { callback: None }
    }

    /// Diagnostics delivered to `callback`.
    pub fn with_callback(callback: DiagnosticCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn emit(&self, line: &str) {
        match self.callback {
            Some(ref callback) => callback(line),
            None => eprintln!("{}", line),
        }
    }

    /// Report an error together with the call stack at the point of the report.
    pub fn error<E>(&self, context: &str, err: E)
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.emit(&format!("[LOGGER ERROR] {}: {}", context, wrap(err)));
    }

    pub fn warning(&self, message: &str) {
        self.emit(&format!("[LOGGER WARNING] {}", message));
    }

    /// Record that a log line was, or may have been, lost.
    pub fn dropped(&self, maybe: bool, rendered: &str) {
        let rendered = rendered.trim_end_matches('\n');
        if maybe {
            self.emit(&format!("Maybe drop log: {}", rendered));
        } else {
            self.emit(&format!("Drop log: {}", rendered));
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
