// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded pool for synchronous unit entry points.
//!
//! A semaphore caps how many blocking entry points run at once; each admitted
//! call runs on tokio's blocking thread pool. The pool is created once at
//! startup and shared by reference.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::errors::InvocationError;

#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            semaphore: Arc::new(Semaphore::new(size)),
        }
    }

    /// One worker per available CPU.
    pub fn with_cpu_count() -> Self {
        Self::new(default_worker_count())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of workers currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run a blocking closure once a worker slot is free.
    pub async fn run<T, F>(&self, unit: &str, work: F) -> Result<T, InvocationError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| InvocationError::PoolClosed)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                InvocationError::Panicked {
                    unit: unit.to_string(),
                }
            } else {
                InvocationError::PoolClosed
            }
        })
    }

    /// Refuse new work; calls already admitted run to completion.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
