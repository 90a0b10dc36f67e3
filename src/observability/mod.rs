// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability for The Switchboard: structured log messages and subscriber setup.
//!
//! Diagnostic output goes through `tracing`. Message text lives in
//! [`messages`] as small structs implementing `Display`, so call sites never
//! carry magic strings:
//!
//! ```rust
//! use the_switchboard::observability::messages::discovery::UnitDiscovered;
//!
//! let msg = UnitDiscovered {
//!     unit: "SummaryAndTags",
//!     file: std::path::Path::new("units/blog_tools.yaml"),
//! };
//!
//! tracing::info!("{}", msg);
//! ```
//!
//! Invocation audit records are not tracing output; they are NDJSON files
//! written by [`crate::logs`].

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies.
/// Calling this twice is harmless: the second install is ignored.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
