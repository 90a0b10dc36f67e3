// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{Inputs, InvocationContext, UnitOutput};
use crate::errors::UnitError;
use crate::traits::Delegate;

/// Which entry point the engine should call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `forward`, run on the bounded worker pool.
    Sync,
    /// `aforward`, awaited directly on the runtime.
    Async,
}

/// A user-authored computational unit.
///
/// A fresh instance is constructed for every invocation, so implementations
/// may hold per-call state without synchronisation. Implement `forward` for
/// blocking work or `aforward` (and return [`EntryPoint::Async`]) for async
/// work; the engine only ever calls the one named by `entry_point`.
#[async_trait]
pub trait Unit: Send + Sync {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::Sync
    }

    fn forward(&self, _ctx: &InvocationContext, _inputs: Inputs) -> Result<UnitOutput, UnitError> {
        Err(UnitError::NotImplemented("synchronous"))
    }

    async fn aforward(
        &self,
        _ctx: &InvocationContext,
        _inputs: Inputs,
    ) -> Result<UnitOutput, UnitError> {
        Err(UnitError::NotImplemented("asynchronous"))
    }

    /// Delegate attributes in declaration order, used for contract inference.
    fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
        Vec::new()
    }
}
