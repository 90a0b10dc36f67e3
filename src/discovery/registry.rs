// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::discovery::UnitClass;
use crate::errors::DiscoveryError;
use crate::signature::{CallContract, SignatureExtractor, Strategy};

/// A unit found at startup, with whatever contract could be obtained for it.
#[derive(Debug, Clone)]
pub struct DiscoveredUnit {
    pub name: String,
    pub class: Arc<UnitClass>,
    pub contract: Option<CallContract>,
    pub signature_string: Option<String>,
    pub strategy: Option<Strategy>,
}

impl DiscoveredUnit {
    /// Wrap a class, running contract extraction once.
    pub fn from_class(class: UnitClass) -> Self {
        let extracted = SignatureExtractor::extract(&class);
        Self {
            name: class.name().to_string(),
            contract: extracted.as_ref().map(|e| e.contract.clone()),
            signature_string: extracted.as_ref().map(|e| e.signature_string.clone()),
            strategy: extracted.map(|e| e.strategy),
            class: Arc::new(class),
        }
    }

    pub fn is_typed(&self) -> bool {
        self.contract.is_some()
    }
}

/// Immutable set of discovered units, built once at startup.
///
/// Unit names are unique; registering a second unit under an existing name
/// fails with [`DiscoveryError::DuplicateUnit`] naming both source files.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: IndexMap<String, Arc<DiscoveredUnit>>,
}

impl UnitRegistry {
    pub fn from_units(
        units: impl IntoIterator<Item = DiscoveredUnit>,
    ) -> Result<Self, DiscoveryError> {
        let mut registry = IndexMap::new();
        for unit in units {
            if let Some(existing) = registry.get(&unit.name) {
                let existing: &Arc<DiscoveredUnit> = existing;
                return Err(DiscoveryError::DuplicateUnit {
                    name: unit.name.clone(),
                    first: source_of(existing),
                    second: source_of(&unit),
                });
            }
            registry.insert(unit.name.clone(), Arc::new(unit));
        }
        Ok(Self { units: registry })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DiscoveredUnit>> {
        self.units.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DiscoveredUnit>> {
        self.units.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

fn source_of(unit: &DiscoveredUnit) -> PathBuf {
    unit.class
        .source_file()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("<builtin>"))
}
