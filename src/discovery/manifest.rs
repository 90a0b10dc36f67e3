// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Unit manifest files.
//!
//! ```yaml
//! classes:
//!   - name: SummaryAndTags
//!     base: Module
//!     impl_: summary_and_tags
//!     forward: |
//!       summary = self.summarizer(blog_post=blog_post).summary
//!       tags = self.tagger(blog_post=blog_post).tags
//!       return Prediction(summary=summary, tags=tags)
//!     gateways:
//!       - type: api
//!         path: /blog/summarize
//! ```

use serde::Deserialize;

use crate::gateway::GatewayDecl;
use crate::signature::ForwardDecl;

/// Base class every unit declares.
pub const UNIT_BASE: &str = "Module";

#[derive(Debug, Clone, Deserialize)]
pub struct UnitManifest {
    #[serde(default)]
    pub classes: Vec<ClassManifest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassManifest {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    /// File stem of the manifest that defines the class; others re-export it.
    #[serde(default)]
    pub defined_in: Option<String>,
    /// Catalog key of the implementation; defaults to the class name.
    #[serde(default, alias = "impl")]
    pub impl_: Option<String>,
    #[serde(default)]
    pub forward: Option<String>,
    #[serde(default)]
    pub forward_types: Option<ForwardDecl>,
    #[serde(default)]
    pub gateways: Vec<GatewayDecl>,
}

impl ClassManifest {
    pub fn implementation(&self) -> &str {
        self.impl_.as_deref().unwrap_or(&self.name)
    }

    pub fn is_unit(&self) -> bool {
        self.base.as_deref() == Some(UNIT_BASE) && self.name != UNIT_BASE
    }

    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }

    /// Defined in a different file than `file_stem`.
    pub fn is_reexport(&self, file_stem: &str) -> bool {
        self.defined_in
            .as_deref()
            .is_some_and(|defined_in| defined_in != file_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let yaml = r#"
classes:
  - name: Echo
    base: Module
    impl: echo
    forward_types:
      params: { text: str }
      returns: { processed_text: str, length: int }
    gateways: [NightlyDigest, { type: api, path: /echo/v2, method: PUT }]
  - name: Helper
    base: object
  - name: Module
    base: Module
  - name: _Private
    base: Module
  - name: Shared
    base: Module
    defined_in: other
"#;
        let manifest: UnitManifest = serde_yaml::from_str(yaml).unwrap();
        let echo = &manifest.classes[0];
        assert_eq!(echo.implementation(), "echo");
        assert!(echo.forward_types.as_ref().unwrap().to_contract().is_some());
        assert_eq!(echo.gateways.len(), 2);

        let units: Vec<&str> = manifest
            .classes
            .iter()
            .filter(|c| c.is_unit() && c.is_public() && !c.is_reexport("blog_tools"))
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(units, vec!["Echo"]);
    }

    #[test]
    fn test_implementation_defaults_to_name() {
        let manifest: UnitManifest =
            serde_yaml::from_str("classes:\n  - name: Tagger\n    base: Module\n").unwrap();
        assert_eq!(manifest.classes[0].implementation(), "Tagger");
        assert!(!manifest.classes[0].is_reexport("anything"));
    }
}
