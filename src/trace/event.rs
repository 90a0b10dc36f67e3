// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::trace::TokenUsage;
use crate::traits::CallKind;

/// Wire name of a lifecycle event, e.g. `module_start` or `lm_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ModuleStart,
    ModuleEnd,
    LmStart,
    LmEnd,
    ToolStart,
    ToolEnd,
    AdapterFormatStart,
    AdapterFormatEnd,
    AdapterParseStart,
    AdapterParseEnd,
}

impl EventKind {
    pub fn start(kind: CallKind) -> Self {
        match kind {
            CallKind::Module => EventKind::ModuleStart,
            CallKind::Lm => EventKind::LmStart,
            CallKind::Tool => EventKind::ToolStart,
            CallKind::AdapterFormat => EventKind::AdapterFormatStart,
            CallKind::AdapterParse => EventKind::AdapterParseStart,
        }
    }

    pub fn end(kind: CallKind) -> Self {
        match kind {
            CallKind::Module => EventKind::ModuleEnd,
            CallKind::Lm => EventKind::LmEnd,
            CallKind::Tool => EventKind::ToolEnd,
            CallKind::AdapterFormat => EventKind::AdapterFormatEnd,
            CallKind::AdapterParse => EventKind::AdapterParseEnd,
        }
    }

    pub fn call_kind(&self) -> CallKind {
        match self {
            EventKind::ModuleStart | EventKind::ModuleEnd => CallKind::Module,
            EventKind::LmStart | EventKind::LmEnd => CallKind::Lm,
            EventKind::ToolStart | EventKind::ToolEnd => CallKind::Tool,
            EventKind::AdapterFormatStart | EventKind::AdapterFormatEnd => CallKind::AdapterFormat,
            EventKind::AdapterParseStart | EventKind::AdapterParseEnd => CallKind::AdapterParse,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(
            self,
            EventKind::ModuleStart
                | EventKind::LmStart
                | EventKind::ToolStart
                | EventKind::AdapterFormatStart
                | EventKind::AdapterParseStart
        )
    }
}

/// One flat lifecycle event as streamed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub call_id: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl TraceEvent {
    pub fn started(
        kind: CallKind,
        call_id: &str,
        parent_call_id: Option<String>,
        depth: usize,
        name: &str,
        inputs: Value,
    ) -> Self {
        Self {
            kind: EventKind::start(kind),
            call_id: call_id.to_string(),
            timestamp: now_seconds(),
            parent_call_id,
            depth: Some(depth),
            name: Some(name.to_string()),
            inputs: Some(inputs),
            outputs: None,
            duration_ms: None,
            success: None,
            error: None,
            token_usage: None,
        }
    }

    pub fn ended(kind: CallKind, call_id: &str) -> Self {
        Self {
            kind: EventKind::end(kind),
            call_id: call_id.to_string(),
            timestamp: now_seconds(),
            parent_call_id: None,
            depth: None,
            name: None,
            inputs: None,
            outputs: None,
            duration_ms: None,
            success: Some(true),
            error: None,
            token_usage: None,
        }
    }
}

pub(crate) fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
