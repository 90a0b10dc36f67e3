// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-invocation execution context.
//!
//! Every invocation gets its own [`InvocationContext`]: the resolved backend,
//! the trace callbacks observing it, a ledger of model calls, and a unique
//! call id. The context is passed explicitly to the unit's entry point and is
//! also installed ambiently for code that cannot take it as an argument:
//!
//! * async entry points run inside a tokio task-local scope ([`InvocationContext::scope`]);
//! * sync entry points run on a worker thread with a thread-local guard
//!   ([`InvocationContext::enter`]) holding a snapshot taken at dispatch.
//!
//! Because the worker receives a clone, rebinding the backend inside the
//! worker (`ctx.with_backend(..)`) is invisible to the caller and to sibling
//! invocations.

use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::logs::LmCallRecord;
use crate::trace::TokenUsage;
use crate::traits::{BackendHandle, CallEnd, CallKind, CallStart, ExecutionCallback};

tokio::task_local! {
    static TASK_CONTEXT: InvocationContext;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<InvocationContext>> = const { RefCell::new(None) };
}

#[derive(Clone)]
pub struct InvocationContext {
    call_id: String,
    unit: String,
    backend: Option<BackendHandle>,
    callbacks: Vec<Arc<dyn ExecutionCallback>>,
    ledger: Arc<Mutex<Vec<LmCallRecord>>>,
    runtime: Option<Handle>,
}

impl InvocationContext {
    pub fn new(unit: &str) -> Self {
        Self {
            call_id: new_call_id(),
            unit: unit.to_string(),
            backend: None,
            callbacks: Vec::new(),
            ledger: Arc::new(Mutex::new(Vec::new())),
            runtime: Handle::try_current().ok(),
        }
    }

    pub fn with_backend(mut self, backend: BackendHandle) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn ExecutionCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn with_callbacks(mut self, callbacks: Vec<Arc<dyn ExecutionCallback>>) -> Self {
        self.callbacks.extend(callbacks);
        self
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn backend(&self) -> Option<&BackendHandle> {
        self.backend.as_ref()
    }

    pub fn require_backend(&self) -> Result<&BackendHandle, BackendError> {
        self.backend.as_ref().ok_or(BackendError::NoBackend)
    }

    /// Runtime handle captured when the context was created, for blocking on
    /// backend calls from a worker thread.
    pub fn runtime(&self) -> Option<&Handle> {
        self.runtime.as_ref()
    }

    // -- ambient access ------------------------------------------------------

    /// The context installed for the current worker thread or task, if any.
    pub fn current() -> Option<InvocationContext> {
        THREAD_CONTEXT
            .with(|slot| slot.borrow().clone())
            .or_else(|| TASK_CONTEXT.try_with(|ctx| ctx.clone()).ok())
    }

    /// Run `future` with this context installed as the task-local context.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        TASK_CONTEXT.scope(self, future).await
    }

    /// Install this context on the current thread until the guard drops.
    pub fn enter(&self) -> ContextGuard {
        let previous = THREAD_CONTEXT.with(|slot| slot.replace(Some(self.clone())));
        ContextGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    // -- model call ledger ---------------------------------------------------

    pub fn record_lm_call(&self, record: LmCallRecord) {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }

    pub fn lm_calls(&self) -> Vec<LmCallRecord> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn token_usage(&self) -> TokenUsage {
        self.lm_calls()
            .iter()
            .map(|call| TokenUsage::for_model(&call.model, call.input_tokens, call.output_tokens))
            .collect::<Vec<_>>()
            .iter()
            .sum()
    }

    /// Total cost, or `None` when no call reported one.
    pub fn cost_usd(&self) -> Option<f64> {
        self.lm_calls()
            .iter()
            .filter_map(|call| call.cost_usd)
            .fold(None, |acc, cost| Some(acc.unwrap_or(0.0) + cost))
    }

    // -- lifecycle events ----------------------------------------------------

    /// Notify callbacks that a call began; returns the new call's id.
    pub fn start_call(&self, kind: CallKind, name: &str, inputs: &Value) -> String {
        let call_id = new_call_id();
        self.emit_start(&call_id, kind, name, inputs);
        call_id
    }

    pub fn emit_start(&self, call_id: &str, kind: CallKind, name: &str, inputs: &Value) {
        let call = CallStart {
            call_id,
            kind,
            name,
            inputs,
        };
        for callback in &self.callbacks {
            callback.on_start(call);
        }
    }

    pub fn emit_end(
        &self,
        call_id: &str,
        kind: CallKind,
        outputs: Option<&Value>,
        error: Option<&str>,
        usage: Option<&TokenUsage>,
    ) {
        let call = CallEnd {
            call_id,
            kind,
            outputs,
            error,
            usage,
        };
        for callback in &self.callbacks {
            callback.on_end(call);
        }
    }

    /// Run a tool, reporting it to the trace as a tool call.
    pub fn run_tool<T, E, F>(&self, name: &str, args: Value, tool: F) -> Result<T, E>
    where
        T: serde::Serialize,
        E: std::fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        let call_id = self.start_call(CallKind::Tool, name, &args);
        let result = tool();
        match &result {
            Ok(value) => {
                let outputs = serde_json::to_value(value).unwrap_or(Value::Null);
                self.emit_end(&call_id, CallKind::Tool, Some(&outputs), None, None);
            }
            Err(e) => {
                let message = e.to_string();
                self.emit_end(&call_id, CallKind::Tool, None, Some(&message), None);
            }
        }
        result
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("call_id", &self.call_id)
            .field("unit", &self.unit)
            .field("backend", &self.backend)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Restores the previous thread-local context on drop.
pub struct ContextGuard {
    previous: Option<InvocationContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_CONTEXT.with(|slot| *slot.borrow_mut() = previous);
    }
}

fn new_call_id() -> String {
    Uuid::new_v4().to_string()
}
