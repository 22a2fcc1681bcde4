//! Console sink writing to standard error

use crate::core::error::Result;
use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::CoreSink;
use crate::core::record::LogRecord;
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

pub struct ConsoleSink {
    use_colors: bool,
    formatter: Arc<dyn Formatter>,
}

impl ConsoleSink {
    /// Colours are enabled when standard error is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: io::stderr().is_terminal(),
            formatter: Arc::new(FullFormatter::new()),
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    #[cfg(feature = "console")]
    fn render(&self, record: &LogRecord) -> Vec<u8> {
        let bytes = self.formatter.format(record);
        if !self.use_colors {
            return bytes;
        }
        let line = String::from_utf8_lossy(&bytes);
        format!(
            "{}\n",
            line.trim_end_matches('\n').color(record.level.color_code())
        )
        .into_bytes()
    }

    #[cfg(not(feature = "console"))]
    fn render(&self, record: &LogRecord) -> Vec<u8> {
        self.formatter.format(record)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreSink for ConsoleSink {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        // Standard error is unbuffered; one write per record keeps lines whole
        io::stderr().lock().write_all(&self.render(record))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        io::stderr().flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formatter::LevelOnlyFormatter;
    use crate::core::level::Level;

    #[test]
    fn test_plain_rendering() {
        let sink = ConsoleSink::new()
            .with_colors(false)
            .with_formatter(Arc::new(LevelOnlyFormatter));
        let out = sink.render(&LogRecord::new(Level::Err, "a.rs", 1, "boom"));
        assert_eq!(out, b"[ERR  ] boom\n");
    }

    #[test]
    fn test_console_sink_output() {
        let mut sink = ConsoleSink::new().with_colors(false);
        sink.output(&LogRecord::new(Level::Info, "a.rs", 1, "console test"))
            .unwrap();
        sink.close().unwrap();
    }
}
