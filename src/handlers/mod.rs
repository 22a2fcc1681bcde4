//! Handler implementations
//!
//! Sinks ([`CoreSink`](crate::core::CoreSink)) do the actual writing and are
//! driven by an [`AsyncHandler`]. The `new_*_handler` functions build the usual
//! combinations with default settings.

pub mod console;
pub mod file;
pub mod fluentd;
pub mod forward_buffer;
pub mod memory;
pub mod msgpack;
pub mod nop;
pub mod rotating_file;
pub mod stream;
pub mod syslog;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use fluentd::FluentdSink;
pub use forward_buffer::{ForwardBuffer, DEFAULT_BUFFER_LIMIT};
pub use memory::MemoryHandler;
pub use nop::NopHandler;
pub use rotating_file::RotatingFileSink;
pub use stream::StreamSink;
pub use syslog::{Facility, SyslogProtocol, SyslogSink};

use crate::core::error::Result;
use crate::core::worker::AsyncHandler;
use std::path::Path;

/// Handler writing to standard error
pub fn new_console_handler() -> AsyncHandler {
    AsyncHandler::new(ConsoleSink::new())
}

/// Handler appending to the file at `path`
///
/// # Errors
///
/// Returns error if the file or its directory cannot be created
pub fn new_file_handler<P: AsRef<Path>>(path: P) -> Result<AsyncHandler> {
    Ok(AsyncHandler::new(FileSink::new(path)?))
}

/// Handler writing to `path`, rotated once it would grow past `size_limit`
/// bytes, keeping at most `max_backups` old files
///
/// # Errors
///
/// Returns error if the directory of `path` cannot be created
pub fn new_rotating_file_handler<P: AsRef<Path>>(
    path: P,
    size_limit: u64,
    max_backups: usize,
) -> Result<AsyncHandler> {
    Ok(AsyncHandler::new(RotatingFileSink::new(
        path,
        size_limit,
        max_backups,
    )?))
}

/// Handler forwarding to a fluentd `in_forward` input at `address`
///
/// # Errors
///
/// Returns error if `address` cannot be resolved
pub fn new_fluentd_handler(address: &str, tag: &str) -> Result<AsyncHandler> {
    Ok(AsyncHandler::new(FluentdSink::new(address, tag)?))
}

/// Handler forwarding to the local syslog daemon
///
/// # Errors
///
/// Returns error if no local syslog socket accepts a connection
pub fn new_syslog_handler(tag: &str) -> Result<AsyncHandler> {
    Ok(AsyncHandler::new(SyslogSink::new(tag)?))
}

/// Handler forwarding to the syslog daemon at `address`
///
/// # Errors
///
/// Returns error if the initial connection fails
pub fn new_syslog_handler_to(
    tag: &str,
    protocol: SyslogProtocol,
    address: &str,
) -> Result<AsyncHandler> {
    Ok(AsyncHandler::new(SyslogSink::connect(tag, protocol, address)?))
}
