// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for trace recording and live streaming.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// A call started deeper than the recorder's depth guard allows.
///
/// # Log Level
/// `warn!` - Event dropped from the trace
///
/// # Example
/// ```
/// use the_switchboard::observability::messages::trace::TraceDepthExceeded;
///
/// let msg = TraceDepthExceeded {
///     call_id: "c-17",
///     depth: 101,
///     max_depth: 100,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct TraceDepthExceeded<'a> {
    pub call_id: &'a str,
    pub depth: usize,
    pub max_depth: usize,
}

impl Display for TraceDepthExceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Trace depth {} exceeds maximum {}; dropping call {}",
            self.depth, self.max_depth, self.call_id
        )
    }
}

impl StructuredLog for TraceDepthExceeded<'_> {
    fn log(&self) {
        tracing::warn!(
            call_id = self.call_id,
            depth = self.depth,
            max_depth = self.max_depth,
            "{}", self
        );
    }
}

/// An end event arrived for a call the recorder never saw start.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct UnmatchedCallEnd<'a> {
    pub call_id: &'a str,
}

impl Display for UnmatchedCallEnd<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "End event for unknown call {}", self.call_id)
    }
}

impl StructuredLog for UnmatchedCallEnd<'_> {
    fn log(&self) {
        tracing::debug!(call_id = self.call_id, "{}", self);
    }
}

/// A client opened a live trace stream.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct TraceStreamOpened<'a> {
    pub unit: &'a str,
    pub trace_id: &'a str,
}

impl Display for TraceStreamOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Streaming trace {} for unit '{}'", self.trace_id, self.unit)
    }
}
