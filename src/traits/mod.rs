// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backend;
pub mod callback;
pub mod delegate;
pub mod gateway;
pub mod unit;

pub use backend::{BackendHandle, ChatMessage, LanguageModel, ModelRequest, ModelResponse};
pub use callback::{CallEnd, CallKind, CallStart, ExecutionCallback};
pub use delegate::Delegate;
pub use gateway::{ApiGateway, CronGateway, HttpMethod};
pub use unit::{EntryPoint, Unit};
