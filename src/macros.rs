//! Logging macros for ergonomic log message formatting.
//!
//! The macros record the call site with `file!()`/`line!()` and only format
//! the message when some logger on the way to the root admits it.
//!
//! # Examples
//!
//! ```
//! use rust_hierlog::prelude::*;
//! use rust_hierlog::{info, warn};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! let memory = Arc::new(MemoryHandler::new());
//! registry.root().set_level(Level::Info);
//! registry.root().add_handler("memory", memory.clone());
//!
//! let logger = registry.logger("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! warn!(logger, "Port {} is privileged", port);
//!
//! assert_eq!(memory.len(), 2);
//! ```

/// Log a message at the given level.
///
/// # Examples
///
/// ```
/// # use rust_hierlog::prelude::*;
/// # let logger = Registry::new().logger("app");
/// use rust_hierlog::log;
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Err, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_with(
            $level,
            $crate::Location::new(file!(), line!()),
            || format!($($arg)+),
        )
    };
}

/// Log an error.
///
/// # Examples
///
/// ```
/// # use rust_hierlog::prelude::*;
/// # let logger = Registry::new().logger("app");
/// use rust_hierlog::err;
/// err!(logger, "Database connection failed");
/// err!(logger, "Failed to process request: {}", "timeout");
/// ```
#[macro_export]
macro_rules! err {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Err, $($arg)+)
    };
}

/// Log a warning.
///
/// # Examples
///
/// ```
/// # use rust_hierlog::prelude::*;
/// # let logger = Registry::new().logger("app");
/// use rust_hierlog::warn;
/// warn!(logger, "Memory usage high");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log an informational message.
///
/// # Examples
///
/// ```
/// # use rust_hierlog::prelude::*;
/// # let logger = Registry::new().logger("app");
/// use rust_hierlog::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log a debug message.
///
/// # Examples
///
/// ```
/// # use rust_hierlog::prelude::*;
/// # let logger = Registry::new().logger("app");
/// use rust_hierlog::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}
