// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::discovery::UnitClass;
use crate::engine::{Inputs, InvocationContext, Prediction, UnitOutput};
use crate::errors::UnitError;
use crate::signature::{ForwardDecl, SemanticType};
use crate::traits::Unit;

/// Returns its input text and the text's length. Makes no model calls.
#[derive(Debug, Default)]
pub struct Echo;

impl Echo {
    pub fn class() -> UnitClass {
        UnitClass::new("Echo", || Ok(Box::new(Echo) as Box<dyn Unit>)).with_forward_decl(
            ForwardDecl::new()
                .param("self", None)
                .param("text", Some(SemanticType::Str))
                .returns_record(&[
                    ("processed_text", SemanticType::Str),
                    ("length", SemanticType::Int),
                ]),
        )
    }
}

impl Unit for Echo {
    fn forward(&self, _ctx: &InvocationContext, inputs: Inputs) -> Result<UnitOutput, UnitError> {
        let text = inputs.text("text")?;
        Ok(Prediction::new()
            .with("length", json!(text.chars().count()))
            .with("processed_text", text)
            .into())
    }
}
