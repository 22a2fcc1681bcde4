//! Handler that discards everything

use crate::core::handler::Handler;
use crate::core::level::Level;
use crate::core::record::LogRecord;
use std::sync::atomic::{AtomicU8, Ordering};

pub struct NopHandler {
    level: AtomicU8,
}

impl NopHandler {
    pub fn new() -> Self {
        Self {
            level: AtomicU8::new(Level::All as u8),
        }
    }
}

impl Default for NopHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for NopHandler {
    fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    fn output(&self, _record: &LogRecord) {}

    fn flush(&self) {}

    fn close(&self) {}
}
