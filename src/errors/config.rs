// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading the switchboard configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration validation failed:\n{}", format_validation(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The default model alias is not present in the model registry
    UnknownDefaultModel {
        /// The alias named by `models.default`
        alias: String,
    },
    /// A unit is assigned a model alias that doesn't exist
    UnknownProgramModel {
        /// The unit the assignment belongs to
        unit: String,
        /// The alias that couldn't be resolved
        alias: String,
    },
    /// A registry entry has no model identifier
    EmptyModelIdentifier {
        /// The alias with the empty identifier
        alias: String,
    },
    /// The worker pool was configured with zero threads
    ZeroWorkerThreads,
    /// The trace depth guard was configured as zero
    ZeroTraceDepth,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownDefaultModel { alias } => {
                write!(
                    f,
                    "Default model '{}' is not defined in models.registry",
                    alias
                )
            }
            ValidationError::UnknownProgramModel { unit, alias } => {
                write!(
                    f,
                    "Unit '{}' is assigned model '{}' which is not defined in models.registry",
                    unit, alias
                )
            }
            ValidationError::EmptyModelIdentifier { alias } => {
                write!(f, "Model '{}' has an empty model identifier", alias)
            }
            ValidationError::ZeroWorkerThreads => {
                write!(f, "server.sync_worker_threads must be greater than zero")
            }
            ValidationError::ZeroTraceDepth => {
                write!(f, "tracing.max_depth must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
