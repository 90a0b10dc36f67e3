// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Most recent entries from `{dir}/{unit}.log`, newest first.
///
/// The writer may be mid-append, so a trailing partial line (or any other
/// unparseable line) is skipped rather than treated as an error, and does
/// not count toward `limit`.
pub fn read_recent(dir: &Path, unit: &str, limit: usize) -> Vec<Value> {
    let path = dir.join(format!("{}.log", unit));
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no log file to read");
            return Vec::new();
        }
    };

    content
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparseable log line");
                None
            }
        })
        .take(limit)
        .collect()
}
