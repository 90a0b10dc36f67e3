// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-invocation structured log records, written asynchronously as NDJSON.

mod entry;
mod reader;
mod writer;

pub use entry::{LmCallRecord, LogEntry, LogTokens};
pub use reader::read_recent;
pub use writer::{LogWriter, BATCH_SIZE};
