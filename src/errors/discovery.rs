// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for unit discovery and registry construction.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Two unit source files define a unit with the same name. Fatal at startup.
    #[error("Duplicate unit name '{name}' defined in both '{first}' and '{second}'")]
    DuplicateUnit {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("units directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    #[error("failed to read unit source '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed unit source '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
