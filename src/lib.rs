// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // language model providers + alias registry
pub mod config;     // switchboard.yaml loading and validation
pub mod discovery;  // unit manifests -> registry
pub mod engine;     // invocation engine, worker pool, context
pub mod errors;     // error handling
pub mod gateway;    // gateway resolution and route planning
pub mod logs;       // per-unit NDJSON invocation logs
pub mod observability;
pub mod scheduler;  // cron-triggered batch runs
pub mod server;     // HTTP + SSE transport
pub mod signature;  // contracts, extraction, request schemas
pub mod trace;      // lifecycle events -> trace trees
pub mod traits;     // unified abstractions
pub mod units;      // built-in units
