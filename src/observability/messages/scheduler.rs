// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for cron job lifecycle and per-item outcomes.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The scheduler started its job loops.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SchedulerStarted {
    pub jobs: usize,
}

impl Display for SchedulerStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler started with {} job(s)", self.jobs)
    }
}

/// The scheduler stopped after cancellation.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SchedulerStopped;

impl Display for SchedulerStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler stopped")
    }
}

/// A scheduled run started for a job.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted<'a> {
    pub unit: &'a str,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting scheduled run for '{}'", self.unit)
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(unit = self.unit, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("scheduled_run", span_name = name, unit = self.unit)
    }
}

/// A trigger fired while the previous run of the same job was still executing.
///
/// # Log Level
/// `warn!` - Run skipped
pub struct RunSkippedOverlap<'a> {
    pub unit: &'a str,
}

impl Display for RunSkippedOverlap<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping run of '{}': previous run still in progress",
            self.unit
        )
    }
}

impl StructuredLog for RunSkippedOverlap<'_> {
    fn log(&self) {
        tracing::warn!(unit = self.unit, "{}", self);
    }
}

/// A job's fetch-inputs hook failed; the run is aborted.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct FetchInputsFailed<'a> {
    pub unit: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for FetchInputsFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Fetching inputs for '{}' failed: {}", self.unit, self.error)
    }
}

impl StructuredLog for FetchInputsFailed<'_> {
    fn log(&self) {
        tracing::error!(unit = self.unit, error = %self.error, "{}", self);
    }
}

/// One item of a batch failed; the rest of the batch continues.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::scheduler::ItemFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
/// let msg = ItemFailed {
///     unit: "NightlyDigest",
///     index: 3,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ItemFailed<'a> {
    pub unit: &'a str,
    pub index: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for ItemFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Item {} of scheduled run for '{}' failed: {}",
            self.index, self.unit, self.error
        )
    }
}

impl StructuredLog for ItemFailed<'_> {
    fn log(&self) {
        tracing::error!(
            unit = self.unit,
            index = self.index,
            error = %self.error,
            "{}", self
        );
    }
}

/// The on-complete hook rejected an item's result.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct CompletionHookFailed<'a> {
    pub unit: &'a str,
    pub index: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for CompletionHookFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Completion hook for item {} of '{}' failed: {}",
            self.index, self.unit, self.error
        )
    }
}

/// A scheduled run finished its batch.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub unit: &'a str,
    pub succeeded: usize,
    pub failed: usize,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduled run for '{}' finished: {} succeeded, {} failed",
            self.unit, self.succeeded, self.failed
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            succeeded = self.succeeded,
            failed = self.failed,
            "{}", self
        );
    }
}
