//! Size-based rotating file sink
//!
//! The active file lives at `path`; rotated files are `path.1` (newest) up to
//! `path.N` (oldest) where `N` is the retention count. Rotation happens before
//! a write that would push a non-empty file past the size limit, so a single
//! record is always written even if it alone exceeds the limit.

use super::file::create_parent_dir;
use crate::core::error::{LoggerError, Result};
use crate::core::formatter::{Formatter, FullFormatter};
use crate::core::handler::CoreSink;
use crate::core::record::LogRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default size limit (10 MB)
pub const DEFAULT_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Default number of rotated files kept
pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// Rotating file sink
///
/// # Examples
///
/// ```no_run
/// use rust_hierlog::handlers::RotatingFileSink;
///
/// // Rotate at 50 MB and keep 7 old files
/// let sink = RotatingFileSink::new("/var/log/app.log", 50 * 1024 * 1024, 7).unwrap();
/// ```
pub struct RotatingFileSink {
    path: PathBuf,
    size_limit: u64,
    max_backups: usize,
    formatter: Arc<dyn Formatter>,
    writer: Option<BufWriter<File>>,
    /// Bytes in the active file, including what is still buffered
    current_size: u64,
    #[cfg(feature = "file-lock")]
    use_lock: bool,
}

impl RotatingFileSink {
    /// Create a rotating sink. The parent directory is created now, the file
    /// itself on the first write.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created
    pub fn new<P: AsRef<Path>>(path: P, size_limit: u64, max_backups: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(LoggerError::config(
                "RotatingFileSink",
                format!("'{}' does not name a file", path.display()),
            ));
        }
        create_parent_dir(&path)?;

        Ok(Self {
            path,
            size_limit,
            max_backups,
            formatter: Arc::new(FullFormatter::new()),
            writer: None,
            current_size: 0,
            #[cfg(feature = "file-lock")]
            use_lock: false,
        })
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Hold an advisory lock on `{path}.lock` while shifting backups, for
    /// several processes sharing one log file.
    #[cfg(feature = "file-lock")]
    #[must_use]
    pub fn with_rotation_lock(mut self, enabled: bool) -> Self {
        self.use_lock = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `index`-th backup
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}", index));
        self.path.with_file_name(name)
    }

    fn open(&mut self) -> Result<()> {
        create_parent_dir(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("Failed to open '{}'", self.path.display()),
                    e,
                )
            })?;

        self.current_size = file.metadata()?.len();
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_record(&mut self, bytes: &[u8]) -> std::result::Result<(), WriteError> {
        if self.writer.is_none() {
            self.open().map_err(WriteError::Retryable)?;
        }

        let len = bytes.len() as u64;
        if self.current_size > 0 && self.current_size.saturating_add(len) > self.size_limit {
            self.rotate()?;
        }

        let writer = self.writer.as_mut().ok_or_else(|| {
            WriteError::Retryable(LoggerError::other("rotating file is not open"))
        })?;
        writer
            .write_all(bytes)
            .map_err(|e| WriteError::Final(e.into()))?;
        self.current_size += len;
        Ok(())
    }

    fn rotate(&mut self) -> std::result::Result<(), WriteError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                WriteError::Final(LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                ))
            })?;
        }

        {
            let _lock = self.lock_rotation().map_err(WriteError::Retryable)?;
            self.shift_backups().map_err(WriteError::Final)?;
        }

        // The shift is complete; opening again starts an empty file
        self.open().map_err(WriteError::Retryable)
    }

    /// `path.N -> path.N+1` for the contiguous run of backups, then
    /// `path -> path.1`.
    fn shift_backups(&self) -> Result<()> {
        if self.max_backups == 0 {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to discard full log file: {}", e),
                )),
                _ => Ok(()),
            };
        }

        let mut highest = 0;
        while highest + 1 < self.max_backups && self.backup_path(highest + 1).exists() {
            highest += 1;
        }

        for i in (1..=highest).rev() {
            rename_replacing(&self.backup_path(i), &self.backup_path(i + 1))?;
        }

        if self.path.exists() {
            rename_replacing(&self.path, &self.backup_path(1))?;
        }
        Ok(())
    }

    #[cfg(feature = "file-lock")]
    fn lock_rotation(&self) -> Result<Option<RotationLock>> {
        if !self.use_lock {
            return Ok(None);
        }
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        RotationLock::acquire(&self.path.with_file_name(name)).map(Some)
    }

    #[cfg(not(feature = "file-lock"))]
    fn lock_rotation(&self) -> Result<Option<()>> {
        Ok(None)
    }
}

/// Outcome of a failed write attempt
enum WriteError {
    /// No byte of the record reached the file and no rotation is half done
    Retryable(LoggerError),
    Final(LoggerError),
}

impl WriteError {
    fn into_inner(self) -> LoggerError {
        match self {
            WriteError::Retryable(e) | WriteError::Final(e) => e,
        }
    }
}

/// Rename, replacing `to` on platforms where rename refuses to overwrite.
fn rename_replacing(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to).map_err(|e| {
        LoggerError::file_rotation(
            from.display().to_string(),
            format!("Failed to rename to '{}': {}", to.display(), e),
        )
    })
}

/// Exclusive advisory lock, released on drop.
#[cfg(feature = "file-lock")]
struct RotationLock {
    file: File,
}

#[cfg(feature = "file-lock")]
impl RotationLock {
    fn acquire(path: &Path) -> Result<Self> {
        use fs2::FileExt;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock_exclusive().map_err(|e| {
            LoggerError::file_rotation(path.display().to_string(), format!("Failed to lock: {}", e))
        })?;
        Ok(Self { file })
    }
}

#[cfg(feature = "file-lock")]
impl Drop for RotationLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

impl CoreSink for RotatingFileSink {
    fn output(&mut self, record: &LogRecord) -> Result<()> {
        let bytes = self.formatter.format(record);
        match self.write_record(&bytes) {
            Ok(()) => Ok(()),
            // Start over on a freshly opened file, once
            Err(WriteError::Retryable(_)) => {
                self.writer = None;
                self.write_record(&bytes).map_err(WriteError::into_inner)
            }
            Err(WriteError::Final(e)) => {
                self.writer = None;
                Err(e)
            }
        }
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
        "rotating_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use tempfile::TempDir;

    fn record(i: usize) -> LogRecord {
        LogRecord::new(Level::Info, "src/rotate.rs", 1, &format!("record {}", i))
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_backup_path() {
        let dir = TempDir::new().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("logs/app.log"), 100, 3).unwrap();
        assert_eq!(sink.backup_path(2), dir.path().join("logs/app.log.2"));
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_rotation_keeps_newest_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 0, 3).unwrap();

        for i in 1..=6 {
            sink.output(&record(i)).unwrap();
        }
        sink.close().unwrap();

        assert!(lines(&path)[0].ends_with("record 6"));
        assert!(lines(&sink.backup_path(1))[0].ends_with("record 5"));
        assert!(lines(&sink.backup_path(2))[0].ends_with("record 4"));
        assert!(lines(&sink.backup_path(3))[0].ends_with("record 3"));
        assert!(!sink.backup_path(4).exists());
    }

    #[test]
    fn test_failed_shift_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 10, 1).unwrap();
        sink.output(&record(1)).unwrap();
        sink.flush().unwrap();

        // A non-empty directory in the way of path -> path.1
        let blocker = sink.backup_path(1);
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let bytes = sink.formatter.format(&record(2));
        assert!(matches!(sink.write_record(&bytes), Err(WriteError::Final(_))));
        assert!(sink.output(&record(2)).is_err());

        assert_eq!(lines(&path).len(), 1);
        assert!(lines(&path)[0].ends_with("record 1"));
        assert!(blocker.join("keep").exists());
        assert!(!sink.backup_path(2).exists());
    }

    #[test]
    fn test_failed_open_is_retryable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/app.log");
        let mut sink = RotatingFileSink::new(&path, 100, 1).unwrap();

        fs::remove_dir(dir.path().join("logs")).unwrap();
        fs::write(dir.path().join("logs"), "not a directory").unwrap();

        let bytes = sink.formatter.format(&record(1));
        assert!(matches!(sink.write_record(&bytes), Err(WriteError::Retryable(_))));
        assert!(sink.output(&record(1)).is_err());
    }

    #[test]
    fn test_oversized_record_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.log");
        let mut sink = RotatingFileSink::new(&path, 10, 2).unwrap();

        sink.output(&record(1)).unwrap();
        sink.flush().unwrap();
        assert_eq!(lines(&path).len(), 1);
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_existing_file_size_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "x".repeat(100)).unwrap();

        let mut sink = RotatingFileSink::new(&path, 120, 1).unwrap();
        sink.output(&record(1)).unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(sink.backup_path(1)).unwrap(), "x".repeat(100));
        assert_eq!(lines(&path).len(), 1);
    }

    #[test]
    fn test_zero_backups_discards_full_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 0, 0).unwrap();

        for i in 1..=3 {
            sink.output(&record(i)).unwrap();
        }
        sink.close().unwrap();

        let content = lines(&path);
        assert_eq!(content.len(), 1);
        assert!(content[0].ends_with("record 3"));
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_gap_in_backups_stops_shift() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 0, 5).unwrap();
        fs::write(sink.backup_path(3), "stale\n").unwrap();

        sink.output(&record(1)).unwrap();
        sink.output(&record(2)).unwrap();
        sink.close().unwrap();

        assert!(lines(&sink.backup_path(1))[0].ends_with("record 1"));
        assert!(!sink.backup_path(2).exists());
        assert_eq!(lines(&sink.backup_path(3)), vec!["stale".to_string()]);
    }

    #[cfg(feature = "file-lock")]
    #[test]
    fn test_rotation_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 0, 2)
            .unwrap()
            .with_rotation_lock(true);

        sink.output(&record(1)).unwrap();
        sink.output(&record(2)).unwrap();
        sink.close().unwrap();

        assert!(dir.path().join("app.log.lock").exists());
        assert!(sink.backup_path(1).exists());
    }
}
