// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deterministic offline model.
//!
//! Answers every request with a JSON object holding one string per requested
//! output field, derived from the user message. Used for local runs, demos and
//! tests where no inference service is reachable.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::BackendError;
use crate::traits::{LanguageModel, ModelRequest, ModelResponse};

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct EchoBackend {
    model: String,
}

impl EchoBackend {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new("echo/default")
    }
}

#[async_trait]
impl LanguageModel for EchoBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let preview: String = user
            .lines()
            .find_map(|line| line.split_once(": ").map(|(_, value)| value))
            .unwrap_or(user)
            .chars()
            .take(PREVIEW_CHARS)
            .collect();

        let reply: Map<String, Value> = request
            .output_fields
            .iter()
            .map(|field| (field.clone(), Value::String(format!("{}: {}", field, preview))))
            .collect();
        let text = Value::Object(reply).to_string();

        let input_tokens = request
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u64)
            .sum();
        let output_tokens = text.split_whitespace().count() as u64;

        Ok(ModelResponse {
            text,
            input_tokens,
            output_tokens,
            cost_usd: None,
        })
    }
}
