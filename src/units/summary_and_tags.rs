// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::discovery::UnitClass;
use crate::engine::{Inputs, InvocationContext, Predict, Prediction, UnitOutput};
use crate::errors::UnitError;
use crate::signature::{CallContract, SemanticType};
use crate::traits::{Delegate, Unit};

const FORWARD: &str = r#"
summary = self.summarizer(**kwargs)
tags = self.tagger(blog_post=summary.summary)
return Prediction(summary=summary.summary, tags=tags.tags)
"#;

/// Summarizes a blog post, then tags the summary.
pub struct SummaryAndTags {
    summarizer: Predict,
    tagger: Predict,
}

impl SummaryAndTags {
    pub fn new() -> Self {
        let lengths = ["short", "medium", "long"].map(String::from).to_vec();
        Self {
            summarizer: Predict::new(
                CallContract::new()
                    .with_instructions("Given a blog post, generate a short summary of 2-3 sentences.")
                    .input("blog_post", SemanticType::Str, "The content of the blog post to summarize.")
                    .input("summary_length", SemanticType::Literal(lengths), "")
                    .output("summary", SemanticType::Str, "A summary of the blog post."),
            ),
            tagger: Predict::new(
                CallContract::new()
                    .with_instructions("Given a blog post, generate relevant tags for the post.")
                    .input("blog_post", SemanticType::Str, "")
                    .output("tags", SemanticType::List(Box::new(SemanticType::Str)), ""),
            ),
        }
    }

    pub fn class() -> UnitClass {
        UnitClass::new("SummaryAndTags", || Ok(Box::new(Self::new()) as Box<dyn Unit>))
            .with_forward_source(FORWARD)
    }
}

impl Default for SummaryAndTags {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for SummaryAndTags {
    fn forward(&self, ctx: &InvocationContext, inputs: Inputs) -> Result<UnitOutput, UnitError> {
        let summary = self.summarizer.call(ctx, &inputs)?;
        let tags = self
            .tagger
            .call(ctx, &Inputs::new().with("blog_post", summary.text("summary")))?;

        Ok(Prediction::new()
            .with("summary", summary.text("summary"))
            .with("tags", tags.get("tags").cloned().unwrap_or_default())
            .into())
    }

    fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
        vec![("summarizer", &self.summarizer), ("tagger", &self.tagger)]
    }
}
