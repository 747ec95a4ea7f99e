//! Cost Estimator
//!
//! The endpoint reports only a total token count, so the input/output split
//! is assumed rather than measured.

use serde::{Deserialize, Serialize};

use crate::constants::pricing;
use crate::types::TokenCount;

/// Per-million-token prices and the assumed input share
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub input_ratio: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: pricing::INPUT_PER_MILLION,
            output_per_million: pricing::OUTPUT_PER_MILLION,
            input_ratio: pricing::ASSUMED_INPUT_RATIO,
        }
    }
}

impl Pricing {
    /// Estimated USD cost for `tokens`
    pub fn cost_usd(&self, tokens: TokenCount) -> f64 {
        let total = tokens.get() as f64;
        let input_tokens = total * self.input_ratio;
        let output_tokens = total * (1.0 - self.input_ratio);
        input_tokens * self.input_per_million / 1_000_000.0
            + output_tokens * self.output_per_million / 1_000_000.0
    }

    /// Estimated cost formatted with exactly six fractional digits
    pub fn calculate_cost(&self, tokens: TokenCount) -> String {
        format_cost(self.cost_usd(tokens))
    }
}

/// `calculate_cost` with the default pricing
pub fn calculate_cost(tokens: impl Into<TokenCount>) -> String {
    Pricing::default().calculate_cost(tokens.into())
}

/// Format a USD amount as a fixed six-decimal string
pub fn format_cost(usd: f64) -> String {
    format!("{:.6}", usd.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use regex::Regex;

    #[test]
    fn test_one_million_tokens() {
        assert_eq!(calculate_cost(1_000_000u64), "0.285000");
    }

    #[test]
    fn test_zero_tokens() {
        assert_eq!(calculate_cost(0u64), "0.000000");
    }

    #[test]
    fn test_small_call() {
        // 1000 tokens: 700 * 0.15e-6 + 300 * 0.60e-6 = 0.000285
        assert_eq!(calculate_cost(1000u64), "0.000285");
    }

    #[test]
    fn test_custom_pricing() {
        let pricing = Pricing {
            input_per_million: 1.0,
            output_per_million: 1.0,
            input_ratio: 0.5,
        };
        assert_eq!(pricing.calculate_cost(TokenCount::new(2_000_000)), "2.000000");
    }

    proptest! {
        #[test]
        fn prop_cost_format(tokens in 0u64..10_000_000_000) {
            let re = Regex::new(r"^\d+\.\d{6}$").unwrap();
            prop_assert!(re.is_match(&calculate_cost(tokens)));
        }
    }
}
