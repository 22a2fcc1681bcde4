//! Declarative configuration
//!
//! A [`LoggingConfig`] describes loggers and the handlers bound to them. It is
//! usually read from JSON and then applied to a [`Registry`]:
//!
//! ```json
//! {
//!   "source_root": "/build/app",
//!   "loggers": [
//!     { "name": "", "level": "INFO",
//!       "handlers": { "console": { "type": "console" } } },
//!     { "name": "db", "level": "DEBUG", "use_parent": false,
//!       "handlers": {
//!         "file": { "type": "rotating_file", "path": "/var/log/db.log",
//!                   "size_limit": 1048576, "max_backups": 3, "level": "WARN" } } }
//!   ]
//! }
//! ```

use super::error::{LoggerError, Result};
use super::formatter::OutputFormat;
use super::handler::{CoreSink, HandlerRef};
use super::level::Level;
use super::registry::Registry;
use super::worker::AsyncHandler;
use crate::handlers::{
    ConsoleSink, Facility, FileSink, FluentdSink, MemoryHandler, NopHandler, RotatingFileSink,
    SyslogProtocol, SyslogSink,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Build-root prefix stripped from source paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default)]
    pub loggers: Vec<LoggerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// `/`-delimited logger name; `""` is the root
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_parent: Option<bool>,

    /// Handlers keyed by the id they are registered under
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(flatten)]
    pub kind: HandlerKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerKind {
    Console {
        #[serde(default)]
        format: OutputFormat,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        colors: Option<bool>,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        format: OutputFormat,
    },
    RotatingFile {
        path: PathBuf,
        size_limit: u64,
        max_backups: usize,
        #[serde(default)]
        format: OutputFormat,
        #[serde(default)]
        lock: bool,
    },
    Fluentd {
        address: String,
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buffer_limit: Option<usize>,
    },
    Syslog {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<SyslogProtocol>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(default)]
        facility: Facility,
    },
    Memory,
    Nop,
}

/// Delivery worker tuning; unset fields keep their defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_flush_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_budget: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval_ms: Option<u64>,
}

impl LoggingConfig {
    /// # Errors
    ///
    /// Returns error if `json` is not a valid configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logging configuration",
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Configure `registry`. Handlers are built first; the registry is only
    /// touched once all of them were created.
    ///
    /// # Errors
    ///
    /// Returns error if a handler cannot be constructed
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        let mut built = Vec::with_capacity(self.loggers.len());
        for logger in &self.loggers {
            let mut handlers = Vec::with_capacity(logger.handlers.len());
            for (id, config) in &logger.handlers {
                let handler = config.build().map_err(|e| {
                    LoggerError::config(
                        format!("handler '{}' of logger '{}'", id, logger.name),
                        e.to_string(),
                    )
                })?;
                handlers.push((id.clone(), handler));
            }
            built.push((logger, handlers));
        }

        if let Some(ref root) = self.source_root {
            registry.set_source_root(root.clone());
        }

        for (config, handlers) in built {
            let logger = registry.logger(&config.name);
            if let Some(level) = config.level {
                logger.set_level(level);
            }
            if let Some(use_parent) = config.use_parent {
                logger.set_use_parent(use_parent);
            }
            for (id, handler) in handlers {
                if let Some(old) = logger.add_handler(id, handler) {
                    old.close();
                }
            }
        }
        Ok(())
    }
}

impl HandlerConfig {
    /// # Errors
    ///
    /// Returns error if the underlying sink cannot be created
    pub fn build(&self) -> Result<HandlerRef> {
        let handler: HandlerRef = match self.kind {
            HandlerKind::Console { format, colors } => {
                let mut sink = ConsoleSink::new().with_formatter(format.formatter());
                if let Some(colors) = colors {
                    sink = sink.with_colors(colors);
                }
                self.spawn(sink)
            }
            HandlerKind::File { ref path, format } => {
                self.spawn(FileSink::new(path)?.with_formatter(format.formatter()))
            }
            HandlerKind::RotatingFile {
                ref path,
                size_limit,
                max_backups,
                format,
                lock,
            } => {
                let sink = RotatingFileSink::new(path, size_limit, max_backups)?
                    .with_formatter(format.formatter());
                #[cfg(feature = "file-lock")]
                let sink = sink.with_rotation_lock(lock);
                #[cfg(not(feature = "file-lock"))]
                if lock {
                    return Err(LoggerError::config(
                        "RotatingFileSink",
                        "rotation lock requires the `file-lock` feature",
                    ));
                }
                self.spawn(sink)
            }
            HandlerKind::Fluentd {
                ref address,
                ref tag,
                buffer_limit,
            } => {
                let mut sink = FluentdSink::new(address, tag)?;
                if let Some(limit) = buffer_limit {
                    sink = sink.with_buffer_limit(limit);
                }
                self.spawn(sink)
            }
            HandlerKind::Syslog {
                ref tag,
                protocol,
                ref address,
                facility,
            } => {
                let sink = match (protocol, address) {
                    (None, None) => SyslogSink::new(tag)?,
                    (Some(protocol), Some(address)) => SyslogSink::connect(tag, protocol, address)?,
                    _ => {
                        return Err(LoggerError::config(
                            "SyslogSink",
                            "`protocol` and `address` must be given together",
                        ))
                    }
                };
                self.spawn(sink.with_facility(facility))
            }
            HandlerKind::Memory => Arc::new(MemoryHandler::new()),
            HandlerKind::Nop => Arc::new(NopHandler::new()),
        };

        if let Some(level) = self.level {
            handler.set_level(level);
        }
        Ok(handler)
    }

    fn spawn<S: CoreSink>(&self, sink: S) -> HandlerRef {
        let mut builder = AsyncHandler::builder(sink);
        if let Some(ref worker) = self.worker {
            if let Some(capacity) = worker.capacity {
                builder = builder.capacity(capacity);
            }
            if let Some(ms) = worker.idle_flush_ms {
                builder = builder.idle_flush_interval(Duration::from_millis(ms));
            }
            if let Some(budget) = worker.failure_budget {
                builder = builder.failure_budget(budget);
            }
            if let Some(ms) = worker.probe_interval_ms {
                builder = builder.probe_interval(Duration::from_millis(ms));
            }
        }
        Arc::new(builder.build())
    }
}
