//! # Rust Hierarchical Logger
//!
//! A hierarchical logging framework with asynchronous, crash-resilient
//! delivery.
//!
//! ## Features
//!
//! - **Logger tree**: loggers named like `"server/http"` inherit the handlers
//!   of their ancestors
//! - **Asynchronous handlers**: every sink runs on its own worker thread behind
//!   a bounded queue
//! - **Resilient delivery**: sink panics and errors are contained, persistent
//!   failures degrade to drain-only mode until the sink recovers
//! - **Sinks**: console, plain file, rotating file, fluentd and syslog
//!
//! ## Example
//!
//! ```no_run
//! use rust_hierlog::prelude::*;
//! use rust_hierlog::handlers::{new_console_handler, new_rotating_file_handler};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! registry.root().set_level(Level::Info);
//! registry.root().add_handler("console", Arc::new(new_console_handler()));
//!
//! let db = registry.logger("app/db");
//! db.set_level(Level::Debug);
//! db.add_handler(
//!     "file",
//!     Arc::new(new_rotating_file_handler("/var/log/app/db.log", 10 << 20, 5).unwrap()),
//! );
//!
//! db.debug("connection pool ready");
//! registry.close_all();
//! ```

pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        AsyncHandler, AsyncHandlerBuilder, CoreSink, Diagnostics, Handler, HandlerRef, Level,
        Location, LogRecord, Logger, LoggerError, LoggingConfig, Registry, Result,
    };
    pub use crate::handlers::{MemoryHandler, NopHandler};
}

pub use core::{
    wrap, AsyncHandler, AsyncHandlerBuilder, CoreSink, DiagnosticCallback, Diagnostics, Formatter,
    FullFormatter, Handler, HandlerConfig, HandlerKind, HandlerMetrics, HandlerRef,
    LevelOnlyFormatter, Level, Location, LogRecord, Logger, LoggerConfig, LoggerError,
    LoggingConfig, OutputFormat, Registry, Result, SourceTrimmer, TracedError, WorkerConfig,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use handlers::{
    new_console_handler, new_file_handler, new_fluentd_handler, new_rotating_file_handler,
    new_syslog_handler, new_syslog_handler_to,
};
