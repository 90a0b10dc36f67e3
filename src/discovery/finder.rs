// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Directory scan that turns unit manifests into a [`UnitRegistry`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::discovery::manifest::UnitManifest;
use crate::discovery::{DiscoveredUnit, UnitCatalog, UnitRegistry};
use crate::errors::DiscoveryError;
use crate::observability::messages::discovery::{
    DiscoveryCompleted, ManifestSkipped, ReexportSkipped, UnitDiscovered, UnitImplementationMissing,
};
use crate::observability::messages::StructuredLog;

/// Discover every unit declared under `units_dir`.
///
/// Manifests are `*.yaml`/`*.yml` files not starting with `_`, read in name
/// order. Unreadable or malformed manifests are logged and skipped; a unit
/// name declared twice is fatal.
pub fn discover(units_dir: &Path, catalog: &UnitCatalog) -> Result<UnitRegistry, DiscoveryError> {
    let manifests = manifest_files(units_dir)?;

    let mut units = Vec::new();
    for path in &manifests {
        let manifest = match read_manifest(path) {
            Ok(manifest) => manifest,
            Err(error) => {
                ManifestSkipped {
                    path,
                    error: &error,
                }
                .log();
                continue;
            }
        };
        units.extend(units_in(path, manifest, catalog));
    }

    let registry = UnitRegistry::from_units(units)?;
    tracing::info!(
        "{}",
        DiscoveryCompleted {
            units_dir,
            manifests: manifests.len(),
            units: registry.len(),
        }
    );
    Ok(registry)
}

fn manifest_files(units_dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !units_dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(units_dir.to_path_buf()));
    }
    let entries = fs::read_dir(units_dir).map_err(|source| DiscoveryError::Read {
        path: units_dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| !name.starts_with('_'))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn read_manifest(path: &Path) -> Result<UnitManifest, DiscoveryError> {
    let content = fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| DiscoveryError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn units_in(path: &Path, manifest: UnitManifest, catalog: &UnitCatalog) -> Vec<DiscoveredUnit> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

    let mut units = Vec::new();
    for class in manifest.classes {
        if !class.is_unit() || !class.is_public() {
            continue;
        }
        if class.is_reexport(stem) {
            tracing::debug!(
                "{}",
                ReexportSkipped {
                    unit: &class.name,
                    defined_in: class.defined_in.as_deref().unwrap_or_default(),
                    file: path,
                }
            );
            continue;
        }

        let Some(prototype) = catalog.get(class.implementation()) else {
            tracing::warn!(
                "{}",
                UnitImplementationMissing {
                    unit: &class.name,
                    implementation: class.implementation(),
                    file: path,
                }
            );
            continue;
        };

        let mut unit_class = prototype
            .clone()
            .with_name(&class.name)
            .with_source_file(path);
        if let Some(source) = &class.forward {
            unit_class = unit_class.with_forward_source(source);
        }
        if let Some(decl) = class.forward_types {
            unit_class = unit_class.with_forward_decl(decl);
        }
        if !class.gateways.is_empty() {
            unit_class = unit_class.with_gateways(class.gateways);
        }

        tracing::info!(
            "{}",
            UnitDiscovered {
                unit: &class.name,
                file: path,
            }
        );
        units.push(DiscoveredUnit::from_class(unit_class));
    }
    units
}
