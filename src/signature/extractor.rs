// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Call contract inference for a unit class.
//!
//! Three strategies are tried in order of decreasing certainty:
//!
//! 1. [`Strategy::Declared`]: the class's declared entry point types.
//! 2. [`Strategy::ControlFlow`]: the entry point body is parsed (never run)
//!    to find the first delegate called and the fields it returns.
//! 3. [`Strategy::InstanceInspection`]: a fresh instance is built and its
//!    delegates are scanned for one exposing a contract.
//!
//! When all three fail the unit is untyped, which is legal.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::discovery::UnitClass;
use crate::observability::messages::discovery::{
    ContractExtracted, ContractUnavailable, ForwardBodyUnparseable,
};
use crate::observability::messages::StructuredLog;
use crate::signature::{CallContract, FieldMap, FieldSpec, ForwardBody};
use crate::traits::{Delegate, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Declared,
    ControlFlow,
    InstanceInspection,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Declared => "declared",
            Strategy::ControlFlow => "control_flow",
            Strategy::InstanceInspection => "instance_inspection",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContract {
    pub contract: CallContract,
    pub signature_string: String,
    pub strategy: Strategy,
}

impl ExtractedContract {
    fn new(contract: CallContract, strategy: Strategy) -> Self {
        Self {
            signature_string: contract.signature_string(),
            contract,
            strategy,
        }
    }
}

pub struct SignatureExtractor;

impl SignatureExtractor {
    pub fn extract(class: &UnitClass) -> Option<ExtractedContract> {
        let extracted = Self::from_declaration(class)
            .map(|c| ExtractedContract::new(c, Strategy::Declared))
            .or_else(|| {
                let instance = class.instantiate().ok()?;
                Self::from_control_flow(class, instance.as_ref())
                    .map(|c| ExtractedContract::new(c, Strategy::ControlFlow))
                    .or_else(|| {
                        Self::from_instance(instance.as_ref())
                            .map(|c| ExtractedContract::new(c, Strategy::InstanceInspection))
                    })
            });

        match &extracted {
            Some(found) => ContractExtracted {
                unit: class.name(),
                strategy: found.strategy,
                signature: &found.signature_string,
            }
            .log(),
            None => ContractUnavailable { unit: class.name() }.log(),
        }
        extracted
    }

    fn from_declaration(class: &UnitClass) -> Option<CallContract> {
        class.forward_decl()?.to_contract()
    }

    fn from_control_flow(class: &UnitClass, instance: &dyn Unit) -> Option<CallContract> {
        let source = class.forward_source()?;
        let body = match ForwardBody::parse(source) {
            Ok(body) => body,
            Err(error) => {
                ForwardBodyUnparseable {
                    unit: class.name(),
                    error: &error,
                }
                .log();
                return None;
            }
        };

        let delegates = instance.delegates();
        let first = body.first_delegate_call()?;
        let delegate = delegates
            .iter()
            .find(|(name, _)| *name == first)
            .and_then(|(_, delegate)| delegate.resolved_contract())?;

        let returned = body.returned_fields();
        let delegate_outputs: HashSet<&str> = delegate.output_names().collect();
        let outputs = if returned.is_empty()
            || returned.iter().map(String::as_str).collect::<HashSet<_>>() == delegate_outputs
        {
            delegate.outputs.clone()
        } else {
            resolve_fields(&returned, &delegates)
        };

        Some(CallContract {
            instructions: delegate.instructions.clone(),
            inputs: delegate.inputs.clone(),
            outputs,
        })
    }

    fn from_instance(instance: &dyn Unit) -> Option<CallContract> {
        instance
            .delegates()
            .into_iter()
            .find_map(|(_, delegate)| delegate.resolved_contract().cloned())
    }
}

/// Look each field up among all delegates' outputs; unknown fields are generic.
fn resolve_fields(fields: &[String], delegates: &[(&str, &dyn Delegate)]) -> FieldMap {
    fields
        .iter()
        .map(|field| {
            let spec = delegates
                .iter()
                .filter_map(|(_, delegate)| delegate.resolved_contract())
                .find_map(|contract| contract.outputs.get(field).cloned())
                .unwrap_or_else(FieldSpec::generic);
            (field.clone(), spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChainOfThought, Inputs, InvocationContext, Predict, UnitOutput};
    use crate::errors::UnitError;
    use crate::signature::{ForwardDecl, SemanticType};

    struct TwoStep {
        summarizer: Predict,
        tagger: Predict,
    }

    impl TwoStep {
        fn new() -> Result<Box<dyn Unit>, UnitError> {
            Ok(Box::new(Self {
                summarizer: Predict::parse("blog_post -> summary").unwrap(),
                tagger: Predict::parse("blog_post -> tags: list[str]").unwrap(),
            }))
        }
    }

    impl Unit for TwoStep {
        fn forward(&self, _ctx: &InvocationContext, _inputs: Inputs) -> Result<UnitOutput, UnitError> {
            unreachable!("extraction never runs the entry point")
        }

        fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
            vec![("summarizer", &self.summarizer), ("tagger", &self.tagger)]
        }
    }

    struct Wrapped {
        generate: ChainOfThought,
    }

    impl Unit for Wrapped {
        fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
            vec![("generate", &self.generate)]
        }
    }

    struct Bare;

    impl Unit for Bare {}

    #[test]
    fn test_declared_types_win() {
        let class = UnitClass::new("Echo", || Ok(Box::new(Bare) as Box<dyn Unit>)).with_forward_decl(
            ForwardDecl::new()
                .param("self", None)
                .param("text", Some(SemanticType::Str))
                .returns_record(&[("processed_text", SemanticType::Str), ("length", SemanticType::Int)]),
        );

        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.strategy, Strategy::Declared);
        assert_eq!(extracted.signature_string, "text -> processed_text, length");
        assert_eq!(extracted.contract.outputs["length"].ty, SemanticType::Int);
    }

    #[test]
    fn test_two_delegates_with_custom_return() {
        let class = UnitClass::new("SummaryAndTags", TwoStep::new).with_forward_source(
            "summary = self.summarizer(blog_post=blog_post).summary\n\
             tags = self.tagger(blog_post=blog_post).tags\n\
             return Prediction(summary=summary, tags=tags)\n",
        );

        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.strategy, Strategy::ControlFlow);
        assert_eq!(extracted.signature_string, "blog_post -> summary, tags");
        assert_eq!(extracted.contract.outputs["summary"].ty, SemanticType::Str);
        assert_eq!(
            extracted.contract.outputs["tags"].ty,
            SemanticType::List(Box::new(SemanticType::Str))
        );
    }

    #[test]
    fn test_unknown_return_field_is_generic() {
        let class = UnitClass::new("Mixed", TwoStep::new).with_forward_source(
            "result = self.summarizer(blog_post=blog_post)\nreturn Prediction(summary=result.summary, score=1)\n",
        );

        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.contract.outputs["score"], FieldSpec::generic());
    }

    #[test]
    fn test_matching_return_inherits_delegate_outputs() {
        let class = UnitClass::new("Passthrough", TwoStep::new).with_forward_source(
            "if blog_post:\n    out = self.tagger(blog_post=blog_post)\nelse:\n    out = self.summarizer(blog_post=blog_post)\nreturn Prediction(tags=out.tags)\n",
        );

        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.signature_string, "blog_post -> tags");
        assert_eq!(
            extracted.contract.outputs["tags"].ty,
            SemanticType::List(Box::new(SemanticType::Str))
        );
    }

    #[test]
    fn test_instance_inspection_unwraps_one_level() {
        let class = UnitClass::new("Headlines", || {
            Ok(Box::new(Wrapped {
                generate: ChainOfThought::parse("topic -> headline").unwrap(),
            }) as Box<dyn Unit>)
        });

        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.strategy, Strategy::InstanceInspection);
        assert_eq!(extracted.signature_string, "topic -> reasoning, headline");
    }

    #[test]
    fn test_unparseable_body_falls_through() {
        let class = UnitClass::new("Broken", TwoStep::new).with_forward_source("x = (\n");
        let extracted = SignatureExtractor::extract(&class).unwrap();
        assert_eq!(extracted.strategy, Strategy::InstanceInspection);
        assert_eq!(extracted.signature_string, "blog_post -> summary");
    }

    #[test]
    fn test_untyped_unit() {
        let class = UnitClass::new("Bare", || Ok(Box::new(Bare) as Box<dyn Unit>));
        assert!(SignatureExtractor::extract(&class).is_none());

        let failing = UnitClass::new("Failing", || Err(UnitError::Failed("no credentials".into())));
        assert!(SignatureExtractor::extract(&failing).is_none());
    }
}
