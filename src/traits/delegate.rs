// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::signature::CallContract;

/// A predictor-like attribute of a unit.
///
/// Either exposes a contract directly (`Predict`) or wraps another delegate
/// that does (`ChainOfThought`).
pub trait Delegate: Send + Sync {
    fn contract(&self) -> Option<&CallContract>;

    fn inner(&self) -> Option<&dyn Delegate> {
        None
    }

    /// The delegate's own contract, or the wrapped delegate's one level down.
    fn resolved_contract(&self) -> Option<&CallContract> {
        self.contract()
            .or_else(|| self.inner().and_then(|inner| inner.contract()))
    }
}
