// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::UnitError;
use crate::gateway::GatewayDecl;
use crate::signature::ForwardDecl;
use crate::traits::Unit;

pub type UnitConstructor = Arc<dyn Fn() -> Result<Box<dyn Unit>, UnitError> + Send + Sync>;

/// A unit type: how to build an instance plus its declared metadata.
#[derive(Clone)]
pub struct UnitClass {
    name: String,
    constructor: UnitConstructor,
    forward_decl: Option<ForwardDecl>,
    forward_source: Option<String>,
    gateways: Vec<GatewayDecl>,
    source_file: Option<PathBuf>,
}

impl UnitClass {
    pub fn new<F>(name: &str, constructor: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Unit>, UnitError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            constructor: Arc::new(constructor),
            forward_decl: None,
            forward_source: None,
            gateways: Vec::new(),
            source_file: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_forward_decl(mut self, decl: ForwardDecl) -> Self {
        self.forward_decl = Some(decl);
        self
    }

    pub fn with_forward_source(mut self, source: &str) -> Self {
        self.forward_source = Some(source.to_string());
        self
    }

    pub fn with_gateways(mut self, gateways: Vec<GatewayDecl>) -> Self {
        self.gateways = gateways;
        self
    }

    pub fn with_source_file(mut self, path: &Path) -> Self {
        self.source_file = Some(path.to_path_buf());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A fresh instance; called once per invocation.
    pub fn instantiate(&self) -> Result<Box<dyn Unit>, UnitError> {
        (self.constructor)()
    }

    pub fn forward_decl(&self) -> Option<&ForwardDecl> {
        self.forward_decl.as_ref()
    }

    pub fn forward_source(&self) -> Option<&str> {
        self.forward_source.as_deref()
    }

    pub fn gateways(&self) -> &[GatewayDecl] {
        &self.gateways
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

impl fmt::Debug for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitClass")
            .field("name", &self.name)
            .field("forward_decl", &self.forward_decl.is_some())
            .field("forward_source", &self.forward_source.is_some())
            .field("gateways", &self.gateways)
            .field("source_file", &self.source_file)
            .finish()
    }
}

/// Unit implementations compiled into the binary, keyed by implementation name.
///
/// Manifests refer to entries here through their `impl_` field; a manifest
/// class without a catalog entry has no entry point and is never discovered.
#[derive(Clone, Default)]
pub struct UnitCatalog {
    classes: BTreeMap<String, UnitClass>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in units.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        crate::units::register_builtins(&mut catalog);
        catalog
    }

    pub fn register(&mut self, implementation: &str, class: UnitClass) {
        self.classes.insert(implementation.to_string(), class);
    }

    pub fn get(&self, implementation: &str) -> Option<&UnitClass> {
        self.classes.get(implementation)
    }

    pub fn contains(&self, implementation: &str) -> bool {
        self.classes.contains_key(implementation)
    }

    pub fn implementations(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl Unit for Nothing {}

    #[test]
    fn test_register_and_instantiate() {
        let mut catalog = UnitCatalog::new();
        catalog.register(
            "nothing",
            UnitClass::new("Nothing", || Ok(Box::new(Nothing) as Box<dyn Unit>)),
        );

        assert!(catalog.contains("nothing"));
        assert!(!catalog.contains("Nothing"));
        let class = catalog.get("nothing").unwrap();
        assert!(class.instantiate().is_ok());
        assert_eq!(catalog.implementations().collect::<Vec<_>>(), vec!["nothing"]);
    }

    #[test]
    fn test_builtins_are_registered() {
        let catalog = UnitCatalog::with_builtins();
        for implementation in ["summary_and_tags", "echo", "headline_generator", "image_headliner"] {
            assert!(catalog.contains(implementation), "missing {}", implementation);
        }
    }
}
