//! Error types for the logger system

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Unrecognized level label
    #[error("level '{label}' does not exist")]
    UnknownLevel { label: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Failed to reach a remote collector
    #[error("Connection to '{address}' failed: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A sink panicked while handling a request
    #[error("Handler '{handler}' panicked: {message}")]
    WorkerPanic { handler: String, message: String },

    /// Handler has been closed
    #[error("Handler '{0}' is closed")]
    HandlerClosed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an unknown level error
    pub fn unknown_level(label: impl Into<String>) -> Self {
        LoggerError::UnknownLevel {
            label: label.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(address: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::Connection {
            address: address.into(),
            source,
        }
    }

    /// Create a worker panic error
    pub fn worker_panic(handler: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::WorkerPanic {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

/// An error decorated with the call stack captured where it was wrapped.
///
/// Produced by [`wrap`]. Wrapping a `TracedError` again returns it unchanged, so
/// call sites may wrap unconditionally.
pub struct TracedError {
    cause: Box<dyn StdError + Send + Sync>,
    trace: Backtrace,
}

impl TracedError {
    /// The undecorated error.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// The captured call stack.
    pub fn stack(&self) -> &Backtrace {
        &self.trace
    }

    /// Discard the trace and return the undecorated error.
    pub fn into_cause(self) -> Box<dyn StdError + Send + Sync> {
        self.cause
    }
}

impl fmt::Display for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.cause, self.trace)
    }
}

impl fmt::Debug for TracedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedError")
            .field("cause", &self.cause)
            .finish_non_exhaustive()
    }
}

impl StdError for TracedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Attach the current call stack to `err`. Idempotent.
pub fn wrap<E>(err: E) -> TracedError
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let boxed: Box<dyn StdError + Send + Sync> = err.into();
    match boxed.downcast::<TracedError>() {
        Ok(traced) => *traced,
        Err(cause) => TracedError {
            cause,
            trace: Backtrace::force_capture(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("RotatingFileSink", "Invalid path");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::unknown_level("LOUD");
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );

        let err = LoggerError::unknown_level("bogus");
        assert_eq!(err.to_string(), "level 'bogus' does not exist");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("writing log file", "cannot write to file", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("writing log file"));
        assert!(err.to_string().contains("cannot write to file"));
    }

    #[test]
    fn test_wrap_captures_stack() {
        let traced = wrap(LoggerError::other("boom"));
        assert_eq!(traced.cause().to_string(), "boom");
        assert!(traced.to_string().starts_with("boom\n"));
        assert!(traced.source().is_some());
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let once = wrap(LoggerError::other("boom"));
        let once_text = once.to_string();
        let once_stack = once.stack().to_string();

        let twice = wrap(once);
        assert_eq!(twice.to_string(), once_text);
        assert_eq!(twice.stack().to_string(), once_stack);
        assert!(twice.cause().downcast_ref::<LoggerError>().is_some());
    }
}
