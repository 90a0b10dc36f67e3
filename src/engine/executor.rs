// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The single entry point for running a unit.
//!
//! Both on-demand routes and the scheduler call [`ExecutionEngine::invoke`],
//! which owns the concurrency discipline:
//!
//! * a fresh unit instance per call;
//! * boundary placeholders converted to media values using the contract;
//! * async entry points awaited inside a task-local context scope;
//! * sync entry points run on the bounded [`WorkerPool`] with a snapshot of
//!   the context installed on the worker thread;
//! * one [`LogEntry`] written per call, success or failure.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::backends::BackendRegistry;
use crate::discovery::DiscoveredUnit;
use crate::engine::{Inputs, InvocationContext, UnitOutput, WorkerPool};
use crate::errors::{InvocationError, UnitError};
use crate::logs::{LogEntry, LogWriter};
use crate::observability::messages::engine::{
    DedicatedThreadFallback, InvocationCompleted, InvocationFailed, InvocationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{BackendHandle, CallKind, EntryPoint, ExecutionCallback, Unit};

pub struct ExecutionEngine {
    pool: Option<Arc<WorkerPool>>,
    backends: Option<Arc<BackendRegistry>>,
    log_writer: Option<LogWriter>,
    logs_dir: PathBuf,
}

impl ExecutionEngine {
    /// Engine with no pool, no backends and no log writer.
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool: None,
            backends: None,
            log_writer: None,
            logs_dir: logs_dir.into(),
        }
    }

    pub fn with_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_backends(mut self, backends: Arc<BackendRegistry>) -> Self {
        self.backends = Some(backends);
        self
    }

    pub fn with_log_writer(mut self, writer: LogWriter) -> Self {
        self.log_writer = Some(writer);
        self
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn pool(&self) -> Option<&Arc<WorkerPool>> {
        self.pool.as_ref()
    }

    /// Backend a unit runs against when the caller supplies no override.
    pub fn default_backend(&self, unit: &str) -> Option<BackendHandle> {
        self.backends.as_ref().and_then(|b| b.for_unit(unit))
    }

    /// Run `unit` once with boundary `inputs`, returning its normalized outputs.
    pub async fn invoke(
        &self,
        unit: &DiscoveredUnit,
        inputs: Map<String, Value>,
        backend: Option<BackendHandle>,
        callbacks: Vec<Arc<dyn ExecutionCallback>>,
    ) -> Result<Map<String, Value>, InvocationError> {
        let started = Instant::now();
        let backend = backend.or_else(|| self.default_backend(&unit.name));
        let model = backend
            .as_ref()
            .map(|b| b.model_id().to_string())
            .unwrap_or_else(|| "none".to_string());

        let mut ctx = InvocationContext::new(&unit.name).with_callbacks(callbacks);
        if let Some(backend) = backend {
            ctx = ctx.with_backend(backend);
        }

        let inputs_snapshot = Value::Object(inputs.clone());
        ctx.emit_start(ctx.call_id(), CallKind::Module, &unit.name, &inputs_snapshot);

        let result = self.execute(unit, &ctx, inputs).await;

        match &result {
            Ok(outputs) => {
                let snapshot = Value::Object(outputs.clone());
                ctx.emit_end(ctx.call_id(), CallKind::Module, Some(&snapshot), None, None);
            }
            Err(e) => {
                let message = e.to_string();
                ctx.emit_end(ctx.call_id(), CallKind::Module, None, Some(&message), None);
            }
        }

        let elapsed = started.elapsed();
        let usage = ctx.token_usage();
        let entry = LogEntry::new(
            &unit.name,
            &model,
            elapsed.as_secs_f64() * 1000.0,
            inputs_snapshot,
        );
        let entry = match &result {
            Ok(outputs) => {
                InvocationCompleted {
                    unit: &unit.name,
                    call_id: ctx.call_id(),
                    duration: elapsed,
                    total_tokens: usage.total(),
                }
                .log();
                entry.succeeded(Value::Object(outputs.clone()))
            }
            Err(e) => {
                InvocationFailed {
                    unit: &unit.name,
                    call_id: ctx.call_id(),
                    error: e,
                }
                .log();
                entry.failed(e.to_string())
            }
        }
        .with_usage(&usage)
        .with_cost(ctx.cost_usd())
        .with_lm_calls(ctx.lm_calls());

        if let Some(writer) = &self.log_writer {
            writer.log(&self.logs_dir, &unit.name, entry);
        }

        result
    }

    async fn execute(
        &self,
        unit: &DiscoveredUnit,
        ctx: &InvocationContext,
        inputs: Map<String, Value>,
    ) -> Result<Map<String, Value>, InvocationError> {
        let instance = unit
            .class
            .instantiate()
            .map_err(|source| InvocationError::Instantiation {
                unit: unit.name.clone(),
                source,
            })?;

        let inputs = Inputs::from_boundary(inputs, unit.contract.as_ref()).map_err(|reason| {
            InvocationError::InvalidInput {
                unit: unit.name.clone(),
                reason,
            }
        })?;

        let entry_point = instance.entry_point();
        let started = InvocationStarted {
            unit: &unit.name,
            call_id: ctx.call_id(),
            model: ctx.backend().map(|b| b.model_id()).unwrap_or("none"),
            entry_point: match entry_point {
                EntryPoint::Sync => "sync",
                EntryPoint::Async => "async",
            },
        };
        started.log();
        let span = started.span("invoke");

        let output = match entry_point {
            EntryPoint::Async => {
                ctx.clone()
                    .scope(instance.aforward(ctx, inputs))
                    .instrument(span)
                    .await
            }
            EntryPoint::Sync => {
                self.run_sync(&unit.name, instance, ctx.clone(), inputs)
                    .instrument(span)
                    .await?
            }
        };

        output
            .map(UnitOutput::normalize)
            .map_err(|source| InvocationError::Unit {
                unit: unit.name.clone(),
                source,
            })
    }

    async fn run_sync(
        &self,
        unit: &str,
        instance: Box<dyn Unit>,
        ctx: InvocationContext,
        inputs: Inputs,
    ) -> Result<Result<UnitOutput, UnitError>, InvocationError> {
        let span = tracing::Span::current();
        let work = move || {
            let _span = span.enter();
            let _guard = ctx.enter();
            instance.forward(&ctx, inputs)
        };
        match &self.pool {
            Some(pool) => pool.run(unit, work).await,
            None => {
                tracing::debug!("{}", DedicatedThreadFallback { unit });
                run_on_dedicated_thread(unit, work).await
            }
        }
    }
}

async fn run_on_dedicated_thread<T, F>(unit: &str, work: F) -> Result<T, InvocationError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name(format!("unit-{}", unit))
        .spawn(move || {
            let _ = tx.send(work());
        })
        .map_err(|source| InvocationError::WorkerSpawn {
            unit: unit.to_string(),
            source,
        })?;
    rx.await.map_err(|_| InvocationError::Panicked {
        unit: unit.to_string(),
    })
}
