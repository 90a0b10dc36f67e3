// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-invocation execution traces.
//!
//! * [`TraceRecorder`] observes lifecycle callbacks and emits flat [`TraceEvent`]s.
//! * [`TraceBuilder`] folds those events back into a [`Trace`] tree.

pub mod builder;
pub mod event;
pub mod recorder;
pub mod usage;

pub use builder::{Span, SpanKind, Trace, TraceBuilder};
pub use event::{EventKind, TraceEvent};
pub use recorder::TraceRecorder;
pub use usage::{ModelTokens, TokenUsage};
