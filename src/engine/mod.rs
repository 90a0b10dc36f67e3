// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Invocation machinery: per-call context, the sync worker pool, the
//! predictor delegates units call, and the [`ExecutionEngine`] tying them
//! together.

pub mod context;
pub mod executor;
pub mod io;
pub mod pool;
pub mod predict;

pub use context::{ContextGuard, InvocationContext};
pub use executor::ExecutionEngine;
pub use io::{FieldValue, Inputs, MediaSource, MediaValue, Prediction, UnitOutput};
pub use pool::{default_worker_count, WorkerPool};
pub use predict::{ChainOfThought, Predict};
