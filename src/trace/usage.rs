// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTokens {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Token counts, in total and broken down per model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_model: BTreeMap<String, ModelTokens>,
}

impl TokenUsage {
    pub fn for_model(model: &str, input_tokens: u64, output_tokens: u64) -> Self {
        let mut by_model = BTreeMap::new();
        by_model.insert(
            model.to_string(),
            ModelTokens {
                input_tokens,
                output_tokens,
            },
        );
        Self {
            input_tokens,
            output_tokens,
            by_model,
        }
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        for (model, tokens) in &other.by_model {
            let entry = self.by_model.entry(model.clone()).or_default();
            entry.input_tokens += tokens.input_tokens;
            entry.output_tokens += tokens.output_tokens;
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.by_model.is_empty()
    }
}

impl<'a> std::iter::Sum<&'a TokenUsage> for TokenUsage {
    fn sum<I: Iterator<Item = &'a TokenUsage>>(iter: I) -> Self {
        iter.fold(TokenUsage::default(), |mut acc, usage| {
            acc.add(usage);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_models() {
        let mut usage = TokenUsage::for_model("a", 10, 5);
        usage.add(&TokenUsage::for_model("b", 1, 1));
        usage.add(&TokenUsage::for_model("a", 2, 3));

        assert_eq!(usage.input_tokens, 13);
        assert_eq!(usage.output_tokens, 9);
        assert_eq!(usage.total(), 22);
        assert_eq!(usage.by_model["a"], ModelTokens { input_tokens: 12, output_tokens: 8 });
        assert_eq!(usage.by_model["b"], ModelTokens { input_tokens: 1, output_tokens: 1 });
    }

    #[test]
    fn test_sum() {
        let parts = vec![TokenUsage::for_model("m", 1, 2), TokenUsage::for_model("m", 3, 4)];
        let total: TokenUsage = parts.iter().sum();
        assert_eq!(total.total(), 10);
        assert!(TokenUsage::default().is_empty());
    }
}
