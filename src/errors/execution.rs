// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while running a unit.

/// Failure of an opaque inference backend call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("model call to '{model}' failed: {reason}")]
    CallFailed { model: String, reason: String },

    #[error("no backend is bound to the current invocation")]
    NoBackend,

    #[error("no provider is registered for model '{model}'")]
    UnknownProvider { model: String },
}

/// Errors a unit's entry point (or one of its delegates) can return.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnitError {
    #[error("missing input field '{0}'")]
    MissingInput(String),

    #[error("input field '{field}' must be {expected}")]
    InvalidInput { field: String, expected: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not parse model response: {0}")]
    Parse(String),

    #[error("{0} entry point is not implemented")]
    NotImplemented(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Failure of a single invocation, surfaced by the execution engine.
///
/// On-demand callers turn this into a 5xx response; the scheduler hands it
/// to the gateway's error hook and moves on to the next item.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("failed to construct unit '{unit}': {source}")]
    Instantiation {
        unit: String,
        #[source]
        source: UnitError,
    },

    #[error("invalid input for unit '{unit}': {reason}")]
    InvalidInput { unit: String, reason: String },

    #[error("unit '{unit}' failed: {source}")]
    Unit {
        unit: String,
        #[source]
        source: UnitError,
    },

    #[error("unit '{unit}' panicked during execution")]
    Panicked { unit: String },

    #[error("could not start a worker thread for unit '{unit}': {source}")]
    WorkerSpawn {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker pool is shut down")]
    PoolClosed,
}

impl InvocationError {
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            InvocationError::Instantiation { unit, .. }
            | InvocationError::InvalidInput { unit, .. }
            | InvocationError::Unit { unit, .. }
            | InvocationError::Panicked { unit }
            | InvocationError::WorkerSpawn { unit, .. } => Some(unit),
            InvocationError::PoolClosed => None,
        }
    }
}
