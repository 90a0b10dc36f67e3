// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for invocation lifecycle and worker pool events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A unit invocation is about to run.
///
/// # Log Level
/// `debug!` - Per-request detail
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::engine::InvocationStarted;
///
/// let msg = InvocationStarted {
///     unit: "SummaryAndTags",
///     call_id: "b9c1",
///     model: "openai/gpt-4o-mini",
///     entry_point: "sync",
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct InvocationStarted<'a> {
    pub unit: &'a str,
    pub call_id: &'a str,
    pub model: &'a str,
    pub entry_point: &'a str,
}

impl Display for InvocationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invoking unit '{}' ({} entry point, model={}, call_id={})",
            self.unit, self.entry_point, self.model, self.call_id
        )
    }
}

impl StructuredLog for InvocationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            unit = self.unit,
            call_id = self.call_id,
            model = self.model,
            entry_point = self.entry_point,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "invocation",
            span_name = name,
            unit = self.unit,
            call_id = self.call_id,
            model = self.model,
            entry_point = self.entry_point,
        )
    }
}

/// A unit invocation returned normally.
///
/// # Log Level
/// `info!` - Important operational event
pub struct InvocationCompleted<'a> {
    pub unit: &'a str,
    pub call_id: &'a str,
    pub duration: Duration,
    pub total_tokens: u64,
}

impl Display for InvocationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unit '{}' completed in {:?} ({} tokens)",
            self.unit, self.duration, self.total_tokens
        )
    }
}

impl StructuredLog for InvocationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            call_id = self.call_id,
            duration_ms = self.duration.as_millis() as u64,
            total_tokens = self.total_tokens,
            "{}", self
        );
    }
}

/// A unit invocation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::engine::InvocationFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "model unavailable");
/// let msg = InvocationFailed {
///     unit: "SummaryAndTags",
///     call_id: "b9c1",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct InvocationFailed<'a> {
    pub unit: &'a str,
    pub call_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for InvocationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unit '{}' failed: {}", self.unit, self.error)
    }
}

impl StructuredLog for InvocationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            unit = self.unit,
            call_id = self.call_id,
            error = %self.error,
            "{}", self
        );
    }
}

/// Worker pool for synchronous entry points created.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerPoolStarted {
    pub workers: usize,
}

impl Display for WorkerPoolStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Sync worker pool ready with {} workers", self.workers)
    }
}

/// No pool is configured, so a sync entry point runs on a dedicated thread.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct DedicatedThreadFallback<'a> {
    pub unit: &'a str,
}

impl Display for DedicatedThreadFallback<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No worker pool configured; running '{}' on a dedicated thread",
            self.unit
        )
    }
}
