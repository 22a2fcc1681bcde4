//! Core logger types and traits

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod level;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod worker;

pub use config::{HandlerConfig, HandlerKind, LoggerConfig, LoggingConfig, WorkerConfig};
pub use diagnostics::{DiagnosticCallback, Diagnostics};
pub use error::{wrap, LoggerError, Result, TracedError};
pub use formatter::{Formatter, FullFormatter, LevelOnlyFormatter, OutputFormat, SourceTrimmer};
pub use handler::{CoreSink, Handler, HandlerRef};
pub use level::Level;
pub use metrics::HandlerMetrics;
pub use record::{Location, LogRecord};
pub use registry::{Logger, Registry, ROOT_NAME};
pub use worker::{
    AsyncHandler, AsyncHandlerBuilder, DEFAULT_CAPACITY, DEFAULT_FAILURE_BUDGET,
    DEFAULT_IDLE_FLUSH_INTERVAL, DEFAULT_PROBE_INTERVAL, DEFAULT_SHUTDOWN_TIMEOUT,
};
