//! Handler and sink traits
//!
//! A [`Handler`] is what loggers talk to: it is shared between threads and
//! never reports errors to the logging call. A [`CoreSink`] is the single
//! threaded implementation behind most handlers; it is owned by exactly one
//! delivery worker (see [`AsyncHandler`](super::worker::AsyncHandler)).

use super::error::Result;
use super::level::Level;
use super::record::LogRecord;
use std::sync::Arc;

pub trait Handler: Send + Sync {
    /// Records lower than this level are ignored. Defaults to [`Level::All`].
    fn level(&self) -> Level;

    fn set_level(&self, level: Level);

    /// Hand a record over for delivery. May block while the handler's
    /// queue is full.
    fn output(&self, record: &LogRecord);

    /// Returns once every record output before this call reached the sink.
    fn flush(&self);

    /// Flush and release the underlying resources. The handler must not be
    /// used afterwards; later calls are ignored.
    fn close(&self);
}

/// Shared handler reference as stored by loggers.
pub type HandlerRef = Arc<dyn Handler>;

/// Non thread-safe output destination driven by a delivery worker.
pub trait CoreSink: Send + 'static {
    fn output(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: CoreSink + ?Sized> CoreSink for Box<S> {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        (**self).output(record)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
