// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Background NDJSON writer.
//!
//! `log` only enqueues. A single dedicated thread blocks for the first
//! queued command, drains up to [`BATCH_SIZE`] more without blocking, groups
//! the batch by destination and unit, and appends one JSON line per entry to
//! `{destination}/{unit}.log`. Shutdown drains everything still queued before
//! the thread exits.

use indexmap::IndexMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::logs::LogEntry;
use crate::observability::messages::log_writer::{
    LogEntryDropped, LogWriteFailed, LogWriterStarted, LogWriterStopped,
};
use crate::observability::messages::StructuredLog;

/// Maximum entries written per batch.
pub const BATCH_SIZE: usize = 50;

enum Command {
    Entry {
        dir: PathBuf,
        unit: String,
        entry: LogEntry,
    },
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to the background writer. Cheap to clone; every clone feeds the
/// same queue.
#[derive(Clone)]
pub struct LogWriter {
    tx: mpsc::UnboundedSender<Command>,
}

impl LogWriter {
    pub fn start() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || writer_loop(rx))?;

        tracing::info!("{}", LogWriterStarted { batch_size: BATCH_SIZE });
        Ok(Self { tx })
    }

    /// Enqueue an entry for `{dir}/{unit}.log`. Never blocks.
    pub fn log(&self, dir: &Path, unit: &str, entry: LogEntry) {
        let command = Command::Entry {
            dir: dir.to_path_buf(),
            unit: unit.to_string(),
            entry,
        };
        if self.tx.send(command).is_err() {
            tracing::warn!("{}", LogEntryDropped { unit });
        }
    }

    /// Resolves once every entry enqueued before the call is on disk.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Drain the queue, write everything, and stop the writer thread.
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

fn writer_loop(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut written: u64 = 0;

    // `None` means every handle was dropped; treat it like a shutdown.
    while let Some(first) = rx.blocking_recv() {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut next = Some(first);

        while let Some(command) = next.take() {
            match command {
                Command::Entry { dir, unit, entry } => {
                    batch.push((dir, unit, entry));
                    if batch.len() < BATCH_SIZE {
                        next = rx.try_recv().ok();
                    }
                }
                Command::Flush(ack) => {
                    written += write_batch(std::mem::take(&mut batch));
                    let _ = ack.send(());
                }
                Command::Shutdown(ack) => {
                    while let Ok(command) = rx.try_recv() {
                        match command {
                            Command::Entry { dir, unit, entry } => batch.push((dir, unit, entry)),
                            Command::Flush(pending) | Command::Shutdown(pending) => {
                                let _ = pending.send(());
                            }
                        }
                    }
                    written += write_batch(std::mem::take(&mut batch));
                    rx.close();
                    tracing::info!("{}", LogWriterStopped { entries_written: written });
                    let _ = ack.send(());
                    return;
                }
            }
        }

        written += write_batch(batch);
    }

    tracing::info!("{}", LogWriterStopped { entries_written: written });
}

/// Append a batch grouped by destination and unit. Returns entries written.
fn write_batch(batch: Vec<(PathBuf, String, LogEntry)>) -> u64 {
    if batch.is_empty() {
        return 0;
    }

    let mut grouped: IndexMap<(PathBuf, String), Vec<String>> = IndexMap::new();
    for (dir, unit, entry) in batch {
        match serde_json::to_string(&entry) {
            Ok(line) => grouped.entry((dir, unit)).or_default().push(line),
            Err(e) => debug!(unit = %unit, error = %e, "skipping unserializable log entry"),
        }
    }

    let mut written = 0;
    for ((dir, unit), lines) in grouped {
        let path = dir.join(format!("{}.log", unit));
        match append_lines(&dir, &path, &lines) {
            Ok(()) => written += lines.len() as u64,
            Err(error) => LogWriteFailed {
                unit: &unit,
                path: &path,
                lines: lines.len(),
                error: &error,
            }
            .log(),
        }
    }
    written
}

fn append_lines(dir: &Path, path: &Path, lines: &[String]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut buffer = lines.join("\n");
    buffer.push('\n');
    file.write_all(buffer.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn entry(unit: &str, n: usize) -> LogEntry {
        LogEntry::new(unit, "test/model", 1.0, json!({ "n": n })).succeeded(json!({ "ok": true }))
    }

    #[tokio::test]
    async fn test_concurrent_entries_land_in_per_unit_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::start().unwrap();
        let units = ["Alpha", "Beta", "Gamma"];

        let mut tasks = Vec::new();
        for worker in 0..10 {
            let writer = writer.clone();
            let path = dir.path().to_path_buf();
            tasks.push(tokio::spawn(async move {
                for i in 0..100 {
                    let n = worker * 100 + i;
                    let unit = units[n % 3];
                    writer.log(&path, unit, entry(unit, n));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        writer.flush().await;

        let mut total = 0;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for unit in units {
            let content = std::fs::read_to_string(dir.path().join(format!("{}.log", unit))).unwrap();
            for line in content.lines() {
                let value: Value = serde_json::from_str(line).unwrap();
                assert_eq!(value["program"], json!(unit));
                let n = value["inputs"]["n"].as_u64().unwrap() as usize;
                assert_eq!(units[n % 3], unit);
                *seen.entry(unit).or_default() += 1;
                total += 1;
            }
        }

        assert_eq!(total, 1000);
        assert_eq!(seen["Alpha"], 334);
        assert_eq!(seen["Beta"], 333);
        assert_eq!(seen["Gamma"], 333);
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_entries() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::start().unwrap();
        for n in 0..(BATCH_SIZE * 3 + 7) {
            writer.log(dir.path(), "Drain", entry("Drain", n));
        }
        writer.shutdown().await;

        let content = std::fs::read_to_string(dir.path().join("Drain.log")).unwrap();
        assert_eq!(content.lines().count(), BATCH_SIZE * 3 + 7);

        // Logging after shutdown is dropped rather than panicking.
        writer.log(dir.path(), "Drain", entry("Drain", 0));
        writer.flush().await;
    }

    #[tokio::test]
    async fn test_separate_destinations_are_kept_apart() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let nested = second.path().join("nested");
        let writer = LogWriter::start().unwrap();

        writer.log(first.path(), "Same", entry("Same", 1));
        writer.log(&nested, "Same", entry("Same", 2));
        writer.flush().await;

        let a = std::fs::read_to_string(first.path().join("Same.log")).unwrap();
        let b = std::fs::read_to_string(nested.join("Same.log")).unwrap();
        assert_eq!(a.lines().count(), 1);
        assert_eq!(b.lines().count(), 1);
        writer.shutdown().await;
    }
}
