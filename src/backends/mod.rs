// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Model backends.
//!
//! The runtime never performs inference itself. Configured model aliases are
//! resolved to [`LanguageModel`](crate::traits::LanguageModel) clients through
//! a [`ProviderCatalog`], keyed by the provider prefix of the model id
//! (`echo/fast` uses the `echo` provider). The only built-in provider is the
//! deterministic [`EchoBackend`]; real providers are registered by the
//! embedding application.

mod echo;
mod registry;

pub use echo::EchoBackend;
pub use registry::{BackendRegistry, ProviderCatalog, ProviderFactory};
