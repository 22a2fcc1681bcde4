//! Sink writing formatted records to any `Write`

use crate::core::error::{LoggerError, Result};
use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::CoreSink;
use crate::core::record::LogRecord;
use std::io::{BufWriter, Write};
use std::sync::Arc;

pub struct StreamSink<W: Write> {
    name: String,
    writer: Option<BufWriter<W>>,
    formatter: Arc<dyn Formatter>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Some(BufWriter::new(writer)),
            formatter: Arc::new(FullFormatter::new()),
        }
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Flush and hand the writer back. `None` once closed.
    pub fn into_inner(mut self) -> Option<W> {
        self.writer.take().and_then(|writer| writer.into_inner().ok())
    }
}

impl<W: Write + Send + 'static> CoreSink for StreamSink<W> {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::HandlerClosed(self.name.clone()))?;
        writer.write_all(&self.formatter.format(record))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
