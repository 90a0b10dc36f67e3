// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trace::TokenUsage;

/// The kind of call a lifecycle event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Module,
    Lm,
    Tool,
    AdapterFormat,
    AdapterParse,
}

#[derive(Debug, Clone, Copy)]
pub struct CallStart<'a> {
    pub call_id: &'a str,
    pub kind: CallKind,
    /// Module name, model id, tool name, or adapter type depending on `kind`.
    pub name: &'a str,
    pub inputs: &'a Value,
}

#[derive(Debug, Clone, Copy)]
pub struct CallEnd<'a> {
    pub call_id: &'a str,
    pub kind: CallKind,
    pub outputs: Option<&'a Value>,
    pub error: Option<&'a str>,
    /// Usage reported by the call itself (model calls only).
    pub usage: Option<&'a TokenUsage>,
}

/// Observer of paired start/end lifecycle events.
///
/// Callbacks are invoked synchronously from whichever thread is running the
/// call, so implementations must be cheap and must not block.
pub trait ExecutionCallback: Send + Sync {
    fn on_start(&self, call: CallStart<'_>);

    fn on_end(&self, call: CallEnd<'_>);
}
