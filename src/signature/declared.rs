// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declared entry point types.
//!
//! ```yaml
//! forward_types:
//!   params:
//!     text: str
//!     max_words: { type: int, description: "Upper bound on output length" }
//!   returns:
//!     processed_text: str
//!     length: int
//! ```
//!
//! `returns: Prediction` declares an opaque output bag, which says nothing
//! about the output fields.

use crate::signature::contract::{CallContract, FieldSpec};
use crate::signature::types::SemanticType;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Short(SemanticType),
    Full {
        #[serde(rename = "type")]
        ty: SemanticType,
        #[serde(default)]
        description: String,
    },
}

impl TypeDecl {
    fn to_field(&self) -> FieldSpec {
        match self {
            TypeDecl::Short(ty) => FieldSpec::new(ty.clone(), ""),
            TypeDecl::Full { ty, description } => FieldSpec::new(ty.clone(), description.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReturnDecl {
    /// A single type name, e.g. `Prediction` or `dict`.
    Opaque(String),
    /// A typed record with named fields.
    Record(IndexMap<String, TypeDecl>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForwardDecl {
    /// Parameters in declaration order; `None` marks an unannotated parameter.
    #[serde(default)]
    pub params: IndexMap<String, Option<TypeDecl>>,
    #[serde(default)]
    pub returns: Option<ReturnDecl>,
}

impl ForwardDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str, ty: Option<SemanticType>) -> Self {
        self.params.insert(name.to_string(), ty.map(TypeDecl::Short));
        self
    }

    pub fn returns_record(mut self, fields: &[(&str, SemanticType)]) -> Self {
        let record = fields
            .iter()
            .map(|(name, ty)| (name.to_string(), TypeDecl::Short(ty.clone())))
            .collect();
        self.returns = Some(ReturnDecl::Record(record));
        self
    }

    pub fn returns_opaque(mut self, name: &str) -> Self {
        self.returns = Some(ReturnDecl::Opaque(name.to_string()));
        self
    }

    /// Contract from a fully typed declaration: at least one parameter, every
    /// parameter annotated, and a typed record as the return type.
    pub fn to_contract(&self) -> Option<CallContract> {
        let record = match self.returns.as_ref()? {
            ReturnDecl::Record(record) if !record.is_empty() => record,
            _ => return None,
        };

        let mut contract = CallContract::new();
        let mut any = false;
        for (name, decl) in self.params.iter().filter(|(name, _)| name.as_str() != "self") {
            contract
                .inputs
                .insert(name.clone(), decl.as_ref()?.to_field());
            any = true;
        }
        if !any {
            return None;
        }

        for (name, decl) in record {
            contract.outputs.insert(name.clone(), decl.to_field());
        }
        Some(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_typed_declaration_yields_contract() {
        let decl = ForwardDecl::new()
            .param("self", None)
            .param("text", Some(SemanticType::Str))
            .param("count", Some(SemanticType::Int))
            .returns_record(&[
                ("processed_text", SemanticType::Str),
                ("length", SemanticType::Int),
            ]);

        let contract = decl.to_contract().unwrap();
        let inputs: Vec<&str> = contract.input_names().collect();
        let outputs: Vec<&str> = contract.output_names().collect();
        assert_eq!(inputs, vec!["text", "count"]);
        assert_eq!(outputs, vec!["processed_text", "length"]);
        assert_eq!(contract.outputs["length"].ty, SemanticType::Int);
    }

    #[test]
    fn test_incomplete_declarations_yield_nothing() {
        let cases = vec![
            (
                "untyped parameter",
                ForwardDecl::new()
                    .param("text", None)
                    .returns_record(&[("out", SemanticType::Str)]),
            ),
            (
                "opaque return",
                ForwardDecl::new()
                    .param("text", Some(SemanticType::Str))
                    .returns_opaque("dspy.Prediction"),
            ),
            (
                "no return",
                ForwardDecl::new().param("text", Some(SemanticType::Str)),
            ),
            (
                "no parameters",
                ForwardDecl::new().returns_record(&[("out", SemanticType::Str)]),
            ),
        ];

        for (label, decl) in cases {
            assert!(decl.to_contract().is_none(), "{}", label);
        }
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = r#"
params:
  text: str
  hint: ~
  max_words: { type: int, description: "Upper bound" }
returns:
  summary: str
"#;
        let decl: ForwardDecl = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(decl.params.len(), 3);
        assert!(decl.params["hint"].is_none());
        assert!(decl.to_contract().is_none());

        let opaque: ForwardDecl = serde_yaml::from_str("params: {text: str}\nreturns: Prediction").unwrap();
        assert_eq!(opaque.returns, Some(ReturnDecl::Opaque("Prediction".to_string())));
    }
}
