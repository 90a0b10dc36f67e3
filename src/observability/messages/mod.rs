// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! This module contains all message types used throughout The Switchboard
//! for diagnostic and operational logging. Each message type implements the
//! `Display` trait to provide consistent, human-readable output; the ones
//! emitted on hot paths also implement [`StructuredLog`] so their fields
//! reach the subscriber as structured key/value pairs.
//!
//! # Organization
//!
//! Messages are organized by subsystem:
//!
//! * `discovery` - Unit discovery and contract extraction
//! * `gateway` - Gateway resolution and route planning
//! * `engine` - Invocation lifecycle and worker pool events
//! * `scheduler` - Cron job lifecycle and per-item outcomes
//! * `trace` - Trace recording and live streaming
//! * `log_writer` - Background NDJSON writer events
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_switchboard::observability::messages::StructuredLog;
//! use the_switchboard::observability::messages::engine::InvocationStarted;
//!
//! let msg = InvocationStarted {
//!     unit: "SummaryAndTags",
//!     call_id: "b9c1",
//!     model: "openai/gpt-4o-mini",
//!     entry_point: "sync",
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod discovery;
pub mod engine;
pub mod gateway;
pub mod log_writer;
pub mod scheduler;
pub mod trace;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its designated level with structured fields.
    fn log(&self);

    /// A span carrying the same fields, for instrumenting the work the
    /// message describes. Only messages that open a unit of work override
    /// this; the rest return a disabled span.
    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}

#[cfg(test)]
mod tests {
    use super::engine::{InvocationCompleted, InvocationStarted};
    use super::scheduler::RunStarted;
    use super::StructuredLog;
    use std::time::Duration;

    fn span_name(span: &tracing::Span) -> Option<&'static str> {
        span.metadata().map(|metadata| metadata.name())
    }

    #[test]
    fn test_work_messages_open_spans() {
        let _subscriber = tracing::subscriber::set_default(tracing_subscriber::registry());

        let invocation = InvocationStarted {
            unit: "Digest",
            call_id: "c-1",
            model: "none",
            entry_point: "sync",
        };
        assert_eq!(span_name(&invocation.span("invoke")), Some("invocation"));

        let run = RunStarted { unit: "Digest" };
        assert_eq!(span_name(&run.span("scheduled_run")), Some("scheduled_run"));

        let completed = InvocationCompleted {
            unit: "Digest",
            call_id: "c-1",
            duration: Duration::from_millis(5),
            total_tokens: 0,
        };
        assert!(completed.span("invoke").is_none());
    }
}
