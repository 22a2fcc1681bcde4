//! In-memory handler for tests
//!
//! Records are kept synchronously, so they are visible as soon as the logging
//! call returns.

use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::Handler;
use crate::core::level::Level;
use crate::core::record::LogRecord;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

pub struct MemoryHandler {
    level: AtomicU8,
    closed: AtomicBool,
    formatter: Arc<dyn Formatter>,
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::with_formatter(Arc::new(FullFormatter::new()))
    }

    pub fn with_formatter(formatter: Arc<dyn Formatter>) -> Self {
        Self {
            level: AtomicU8::new(Level::All as u8),
            closed: AtomicBool::new(false),
            formatter,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Everything captured so far, formatted.
    pub fn dump(&self) -> String {
        let records = self.records.lock();
        let mut out = Vec::new();
        for record in records.iter() {
            out.extend(self.formatter.format(record));
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl Default for MemoryHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for MemoryHandler {
    fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    fn output(&self, record: &LogRecord) {
        if self.is_closed() || !self.level().admits(record.level) {
            return;
        }
        self.records.lock().push(record.clone());
    }

    fn flush(&self) {}

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formatter::LevelOnlyFormatter;

    #[test]
    fn test_dump() {
        let handler = MemoryHandler::with_formatter(Arc::new(LevelOnlyFormatter));
        handler.output(&LogRecord::new(Level::Err, "a.rs", 1, "one"));
        handler.output(&LogRecord::new(Level::Info, "a.rs", 2, "two"));
        assert_eq!(handler.dump(), "[ERR  ] one\n[INFO ] two\n");
    }

    #[test]
    fn test_level_and_close() {
        let handler = MemoryHandler::new();
        handler.set_level(Level::Warn);
        handler.output(&LogRecord::new(Level::Debug, "a.rs", 1, "hidden"));
        assert!(handler.is_empty());

        handler.close();
        handler.output(&LogRecord::new(Level::Err, "a.rs", 1, "late"));
        assert!(handler.is_empty());
    }
}
