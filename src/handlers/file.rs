//! Plain file sink

use super::stream::StreamSink;
use crate::core::error::{LoggerError, Result};
use crate::core::formatter::Formatter;
use crate::core::handler::CoreSink;
use crate::core::record::LogRecord;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appends records to one file. The file is never rotated.
pub struct FileSink {
    path: PathBuf,
    inner: StreamSink<File>,
}

impl FileSink {
    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be created
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        create_parent_dir(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("Failed to open '{}'", path.display()),
                    e,
                )
            })?;

        Ok(Self {
            inner: StreamSink::new("file", file),
            path,
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.inner = self.inner.with_formatter(formatter);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create the directory `path` lives in, if any.
pub(crate) fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "creating log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })
        }
        _ => Ok(()),
    }
}

impl CoreSink for FileSink {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        self.inner.output(record)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use tempfile::TempDir;

    #[test]
    fn test_creates_directories_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/app.log");

        let mut sink = FileSink::new(&path).unwrap();
        sink.output(&LogRecord::new(Level::Info, "a.rs", 1, "first"))
            .unwrap();
        sink.close().unwrap();

        let mut sink = FileSink::new(&path).unwrap();
        sink.output(&LogRecord::new(Level::Info, "a.rs", 2, "second"))
            .unwrap();
        sink.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().ends_with("a.rs:1 first"));
    }

    #[test]
    fn test_directory_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(FileSink::new(dir.path()).is_err());
    }
}
