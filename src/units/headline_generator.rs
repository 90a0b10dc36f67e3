// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;

use crate::discovery::UnitClass;
use crate::engine::{ChainOfThought, Inputs, InvocationContext, UnitOutput};
use crate::errors::UnitError;
use crate::signature::{CallContract, SemanticType};
use crate::traits::{Delegate, EntryPoint, Unit};

/// Proposes headlines for a blog post, reasoning first.
///
/// Runs on the async entry point and reports the post's word count as a
/// tool call before asking the model.
pub struct HeadlineGenerator {
    generate: ChainOfThought,
}

impl HeadlineGenerator {
    pub fn new() -> Self {
        Self {
            generate: ChainOfThought::new(
                CallContract::new()
                    .input("blog_post", SemanticType::Str, "")
                    .output(
                        "headline_candidates",
                        SemanticType::List(Box::new(SemanticType::Str)),
                        "Potential headlines for the blog post.",
                    ),
            ),
        }
    }

    pub fn class() -> UnitClass {
        UnitClass::new("HeadlineGenerator", || {
            Ok(Box::new(Self::new()) as Box<dyn Unit>)
        })
    }
}

impl Default for HeadlineGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Unit for HeadlineGenerator {
    fn entry_point(&self) -> EntryPoint {
        EntryPoint::Async
    }

    async fn aforward(
        &self,
        ctx: &InvocationContext,
        inputs: Inputs,
    ) -> Result<UnitOutput, UnitError> {
        let post = inputs.text("blog_post")?;
        let words = ctx.run_tool("word_count", json!({ "text": post }), || {
            Ok::<_, UnitError>(post.split_whitespace().count())
        })?;

        let mut prediction = self.generate.acall(ctx, &inputs).await?;
        prediction.insert("word_count", json!(words));
        Ok(prediction.into())
    }

    fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
        vec![("generate", &self.generate)]
    }
}
