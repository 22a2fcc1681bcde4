//! Log level definitions
//!
//! Levels are declared from the most restrictive threshold to the most
//! permissive one: `Off`, `Err`, `Warn`, `Info`, `Debug`, `All`. A level earlier
//! in that list is *higher* than a later one. A record is admitted by a
//! threshold when the record's level is not lower than the threshold.

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Threshold that admits nothing.
    Off = 0,
    Err = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    /// Threshold that admits everything.
    All = 5,
}

impl Level {
    /// Every level, from `Off` to `All`.
    pub const VALUES: [Level; 6] = [
        Level::Off,
        Level::Err,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::All,
    ];

    /// Width of the longest label, used to align formatted output.
    pub const LABEL_WIDTH: usize = 5;

    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Err => "ERR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::All => "ALL",
        }
    }

    /// Parse a label produced by [`Level::to_str`]. Matching ignores case.
    pub fn value_of(label: &str) -> Result<Self> {
        Self::VALUES
            .iter()
            .copied()
            .find(|lv| lv.to_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| LoggerError::unknown_level(label))
    }

    /// Iterate over all levels in declaration order.
    pub fn values() -> impl Iterator<Item = Level> + Clone {
        Self::VALUES.into_iter()
    }

    /// `true` when `self` is strictly higher than `other`.
    #[inline]
    pub fn higher(self, other: Level) -> bool {
        (self as u8) < (other as u8)
    }

    /// `true` when `self` is strictly lower than `other`.
    #[inline]
    pub fn lower(self, other: Level) -> bool {
        (self as u8) > (other as u8)
    }

    /// Threshold test: does `self`, used as a threshold, admit a record at `record`?
    #[inline]
    pub fn admits(self, record: Level) -> bool {
        !record.lower(self)
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Off,
            1 => Level::Err,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::All,
        }
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Err => Red,
            Level::Warn => Yellow,
            Level::Info => Green,
            Level::Debug => Blue,
            Level::Off | Level::All => BrightBlack,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    // `Self::Err` would be ambiguous with the `Level::Err` variant.
    fn from_str(s: &str) -> std::result::Result<Self, LoggerError> {
        Level::value_of(s)
    }
}
