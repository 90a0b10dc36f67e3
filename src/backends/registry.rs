// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backends::EchoBackend;
use crate::config::{ModelConfig, ModelsConfig};
use crate::errors::BackendError;
use crate::traits::{BackendHandle, LanguageModel};

/// Builds a model client for a registry entry.
pub type ProviderFactory =
    Arc<dyn Fn(&ModelConfig) -> Result<Arc<dyn LanguageModel>, BackendError> + Send + Sync>;

/// Provider factories keyed by the prefix of a model identifier (`echo/...`).
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register_provider("echo", |config| {
            Ok(Arc::new(EchoBackend::new(&config.model)) as Arc<dyn LanguageModel>)
        });
        catalog
    }

    pub fn register_provider<F>(&mut self, provider: &str, factory: F)
    where
        F: Fn(&ModelConfig) -> Result<Arc<dyn LanguageModel>, BackendError> + Send + Sync + 'static,
    {
        self.factories.insert(provider.to_string(), Arc::new(factory));
    }

    pub fn build(&self, config: &ModelConfig) -> Result<Arc<dyn LanguageModel>, BackendError> {
        let factory = self
            .factories
            .get(config.provider())
            .ok_or_else(|| BackendError::UnknownProvider {
                model: config.model.clone(),
            })?;
        factory(config)
    }
}

/// Configured model aliases and the per-unit assignment.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    handles: IndexMap<String, BackendHandle>,
    default_alias: Option<String>,
    program_models: IndexMap<String, String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every alias in `models.registry`.
    ///
    /// An alias whose provider is unknown, or whose client fails to build, is
    /// left unbound with a warning; units assigned to it run without a backend.
    pub fn from_config(
        models: &ModelsConfig,
        program_models: &IndexMap<String, String>,
        providers: &ProviderCatalog,
    ) -> Self {
        let mut registry = Self {
            default_alias: models.default.clone(),
            program_models: program_models.clone(),
            ..Self::default()
        };
        for (alias, config) in &models.registry {
            match providers.build(config) {
                Ok(model) => registry.insert(alias, model),
                Err(error) => tracing::warn!(
                    alias = %alias,
                    error = %error,
                    "Model alias '{}' is unavailable: {}",
                    alias,
                    error
                ),
            }
        }
        registry
    }

    pub fn insert(&mut self, alias: &str, model: Arc<dyn LanguageModel>) {
        self.handles
            .insert(alias.to_string(), BackendHandle::new(alias, model));
    }

    pub fn with_default(mut self, alias: &str) -> Self {
        self.default_alias = Some(alias.to_string());
        self
    }

    pub fn assign(mut self, unit: &str, alias: &str) -> Self {
        self.program_models
            .insert(unit.to_string(), alias.to_string());
        self
    }

    pub fn get(&self, alias: &str) -> Option<&BackendHandle> {
        self.handles.get(alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// The unit's assigned alias, or the default alias.
    pub fn alias_for(&self, unit: &str) -> Option<&str> {
        self.program_models
            .get(unit)
            .or(self.default_alias.as_ref())
            .map(String::as_str)
    }

    pub fn for_unit(&self, unit: &str) -> Option<BackendHandle> {
        self.alias_for(unit)
            .and_then(|alias| self.handles.get(alias))
            .cloned()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("handles", &self.handles.values().collect::<Vec<_>>())
            .field("default_alias", &self.default_alias)
            .field("program_models", &self.program_models)
            .finish()
    }
}
