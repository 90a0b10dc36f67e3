// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The opaque inference backend boundary.
//!
//! The runtime never answers a model call itself; it hands a typed
//! [`ModelRequest`] to whatever [`LanguageModel`] is bound to the invocation.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::engine::MediaValue;
use crate::errors::BackendError;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MediaValue>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>, attachments: Vec<MediaValue>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            attachments,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    /// Output field names the caller expects in the reply.
    pub output_fields: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: Option<f64>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, e.g. `openai/gpt-4o-mini`.
    fn model(&self) -> &str;

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, BackendError>;
}

/// Cheaply cloneable reference to the backend bound to an invocation.
#[derive(Clone)]
pub struct BackendHandle {
    alias: String,
    model: Arc<dyn LanguageModel>,
}

impl BackendHandle {
    pub fn new(alias: impl Into<String>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            alias: alias.into(),
            model,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn model_id(&self) -> &str {
        self.model.model()
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("alias", &self.alias)
            .field("model", &self.model_id())
            .finish()
    }
}
