// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default bind address for the HTTP server
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;
/// Default directory holding unit manifests, relative to the config file
pub const DEFAULT_UNITS_DIR: &str = "units";
/// Default directory for per-unit NDJSON logs, relative to the config file
pub const DEFAULT_LOGS_DIR: &str = "logs";
/// Calls nested deeper than this are dropped from traces
pub const DEFAULT_TRACE_MAX_DEPTH: usize = 100;
/// Default number of entries returned by the recent-logs endpoint
pub const DEFAULT_RECENT_LOG_LIMIT: usize = 50;
/// Upper bound on the recent-logs endpoint's `limit`
pub const MAX_RECENT_LOG_LIMIT: usize = 1000;
/// Interval between keepalive comments on the live trace stream
pub const STREAM_KEEPALIVE_SECS: u64 = 15;

/// Overrides `logs_dir`
pub const ENV_LOGS_DIR: &str = "SWITCHBOARD_LOGS_DIR";
/// Overrides `server.port`
pub const ENV_PORT: &str = "SWITCHBOARD_PORT";
