// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Checks run in a fixed order and all failures are collected, so a broken
//! config file is reported in one pass:
//!
//! 1. **Model registry**: every entry names a model identifier
//! 2. **Default model**: `models.default` refers to a registry alias
//! 3. **Unit assignments**: every `program_models` alias exists
//! 4. **Resources**: worker pool and trace depth are non-zero
//!
//! ```rust
//! use the_switchboard::config::validate_config;
//!
//! let config = serde_yaml::from_str("app_id: demo\nmodels: { default: fast }\n").unwrap();
//! let errors = validate_config(&config).unwrap_err();
//! assert_eq!(errors[0].to_string(), "Default model 'fast' is not defined in models.registry");
//! ```

use crate::config::Config;
use crate::errors::ValidationError;

pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let registry = &config.models.registry;

    for (alias, model) in registry {
        if model.model.trim().is_empty() {
            errors.push(ValidationError::EmptyModelIdentifier {
                alias: alias.clone(),
            });
        }
    }

    if let Some(alias) = &config.models.default {
        if !registry.contains_key(alias) {
            errors.push(ValidationError::UnknownDefaultModel {
                alias: alias.clone(),
            });
        }
    }

    for (unit, alias) in &config.program_models {
        if !registry.contains_key(alias) {
            errors.push(ValidationError::UnknownProgramModel {
                unit: unit.clone(),
                alias: alias.clone(),
            });
        }
    }

    if config.server.sync_worker_threads == Some(0) {
        errors.push(ValidationError::ZeroWorkerThreads);
    }
    if config.tracing.max_depth == 0 {
        errors.push(ValidationError::ZeroTraceDepth);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_configs() {
        let cases = [
            "app_id: a\n",
            "app_id: a\nmodels: { default: m, registry: { m: { model: echo/m } } }\n",
            "app_id: a\nmodels: { registry: { m: { model: echo/m } } }\nprogram_models: { Echo: m }\n",
        ];
        for yaml in cases {
            assert_eq!(validate_config(&config(yaml)), Ok(()), "{}", yaml);
        }
    }

    #[test]
    fn test_invalid_configs() {
        let cases = vec![
            (
                "app_id: a\nmodels: { default: m }\n",
                ValidationError::UnknownDefaultModel { alias: "m".to_string() },
            ),
            (
                "app_id: a\nprogram_models: { Echo: m }\n",
                ValidationError::UnknownProgramModel {
                    unit: "Echo".to_string(),
                    alias: "m".to_string(),
                },
            ),
            (
                "app_id: a\nmodels: { registry: { m: { model: '  ' } } }\n",
                ValidationError::EmptyModelIdentifier { alias: "m".to_string() },
            ),
            ("app_id: a\nserver: { sync_worker_threads: 0 }\n", ValidationError::ZeroWorkerThreads),
            ("app_id: a\ntracing: { max_depth: 0 }\n", ValidationError::ZeroTraceDepth),
        ];
        for (yaml, expected) in cases {
            assert_eq!(validate_config(&config(yaml)), Err(vec![expected]), "{}", yaml);
        }
    }
}
