//! Record formatting
//!
//! Two layouts are provided:
//! - [`FullFormatter`]: `2025/01/08 10:30:45.123456 INFO  src/main.rs:42 message`
//! - [`LevelOnlyFormatter`]: `[INFO ] message`
//!
//! Both terminate every record with a newline.

use super::level::Level;
use super::record::LogRecord;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Vec<u8>;
}

/// `{date} {time} {level} {file}:{line} {message}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullFormatter {
    utc: bool,
}

impl FullFormatter {
    /// Timestamps rendered in local time.
    pub const fn new() -> Self {
        Self { utc: false }
    }

    /// Timestamps rendered in UTC.
    pub const fn utc() -> Self {
        Self { utc: true }
    }

    fn format_timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        const PATTERN: &str = "%Y/%m/%d %H:%M:%S%.6f";
        if self.utc {
            timestamp.format(PATTERN).to_string()
        } else {
            timestamp.with_timezone(&Local).format(PATTERN).to_string()
        }
    }
}

impl Formatter for FullFormatter {
    fn format(&self, record: &LogRecord) -> Vec<u8> {
        format!(
            "{} {:<width$} {}:{} {}\n",
            self.format_timestamp(&record.timestamp),
            record.level,
            record.file,
            record.line,
            record.message,
            width = Level::LABEL_WIDTH
        )
        .into_bytes()
    }
}

/// `[{level}] {message}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelOnlyFormatter;

impl Formatter for LevelOnlyFormatter {
    fn format(&self, record: &LogRecord) -> Vec<u8> {
        format!(
            "[{:<width$}] {}\n",
            record.level,
            record.message,
            width = Level::LABEL_WIDTH
        )
        .into_bytes()
    }
}

/// Formatter selection for declarative configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Full,
    FullUtc,
    LevelOnly,
}

impl OutputFormat {
    pub fn formatter(&self) -> Arc<dyn Formatter> {
        match self {
            OutputFormat::Full => Arc::new(FullFormatter::new()),
            OutputFormat::FullUtc => Arc::new(FullFormatter::utc()),
            OutputFormat::LevelOnly => Arc::new(LevelOnlyFormatter),
        }
    }
}

/// Strips the build-root prefix from source paths.
///
/// Without an explicit root, absolute paths are cut after their first `/src/`
/// component (dependency sources live under `.../registry/src/...`). Relative
/// paths, which is what `file!()` yields for the crate being built, are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTrimmer {
    root: Option<String>,
}

impl SourceTrimmer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.is_empty() && !root.ends_with(std::path::MAIN_SEPARATOR) {
            root.push(std::path::MAIN_SEPARATOR);
        }
        Self { root: Some(root) }
    }

    pub fn trim<'a>(&self, file: &'a str) -> &'a str {
        if let Some(ref root) = self.root {
            if let Some(rest) = file.strip_prefix(root.as_str()) {
                return rest;
            }
        }

        if std::path::Path::new(file).is_absolute() {
            let src_dir = format!("{sep}src{sep}", sep = std::path::MAIN_SEPARATOR);
            if let Some(pos) = file.find(&src_dir) {
                return &file[pos + src_dir.len()..];
            }
        }
        file
    }
}
