// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::discovery::UnitClass;
use crate::engine::{Inputs, InvocationContext, Predict, Prediction, UnitOutput};
use crate::errors::UnitError;
use crate::signature::{CallContract, MediaKind, SemanticType};
use crate::traits::{Delegate, Unit};

const FORWARD: &str = r#"
description = self.describer(**kwargs).image_description
headliner = self.headliner(blog_post=description)
return Prediction(
    image_description=description,
    headlines=headliner.headline_candidates,
)
"#;

/// Describes an image, then writes headlines for the description.
pub struct ImageHeadliner {
    describer: Predict,
    headliner: Predict,
}

impl ImageHeadliner {
    pub fn new() -> Self {
        Self {
            describer: Predict::new(
                CallContract::new()
                    .input("image", SemanticType::Media(MediaKind::Image), "")
                    .output("image_description", SemanticType::Str, ""),
            ),
            headliner: Predict::new(
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
        UnitClass::new("ImageHeadliner", || Ok(Box::new(Self::new()) as Box<dyn Unit>))
            .with_forward_source(FORWARD)
    }
}

impl Default for ImageHeadliner {
    fn default() -> Self {
        Self::new()
    }
}

impl Unit for ImageHeadliner {
    fn forward(&self, ctx: &InvocationContext, inputs: Inputs) -> Result<UnitOutput, UnitError> {
        let description = self.describer.call(ctx, &inputs)?.text("image_description");
        let headliner = self
            .headliner
            .call(ctx, &Inputs::new().with("blog_post", description.clone()))?;

        Ok(Prediction::new()
            .with("image_description", description)
            .with(
                "headlines",
                headliner.get("headline_candidates").cloned().unwrap_or_default(),
            )
            .into())
    }

    fn delegates(&self) -> Vec<(&str, &dyn Delegate)> {
        vec![("describer", &self.describer), ("headliner", &self.headliner)]
    }
}
