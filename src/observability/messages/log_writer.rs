// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the background log writer.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Background writer thread started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LogWriterStarted {
    pub batch_size: usize,
}

impl Display for LogWriterStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Background log writer started (batch_size={})", self.batch_size)
    }
}

/// Background writer drained its queue and stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LogWriterStopped {
    pub entries_written: u64,
}

impl Display for LogWriterStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Background log writer stopped after writing {} entries",
            self.entries_written
        )
    }
}

/// A batch could not be appended to a unit's log file.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::log_writer::LogWriteFailed;
/// use std::path::Path;
///
/// let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
/// let msg = LogWriteFailed {
///     unit: "Summarize",
///     path: Path::new("logs/Summarize.log"),
///     lines: 12,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct LogWriteFailed<'a> {
    pub unit: &'a str,
    pub path: &'a Path,
    pub lines: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for LogWriteFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to write {} log lines for '{}' to {}: {}",
            self.lines,
            self.unit,
            self.path.display(),
            self.error
        )
    }
}

impl StructuredLog for LogWriteFailed<'_> {
    fn log(&self) {
        tracing::error!(
            unit = self.unit,
            path = %self.path.display(),
            lines = self.lines,
            error = %self.error,
            "{}", self
        );
    }
}

/// An entry was dropped because the writer has already stopped.
///
/// # Log Level
/// `warn!` - Entry lost
pub struct LogEntryDropped<'a> {
    pub unit: &'a str,
}

impl Display for LogEntryDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Log writer is not running; dropped log entry for '{}'",
            self.unit
        )
    }
}
