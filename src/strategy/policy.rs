//! Confidence gate and pick selection.
//!
//! A bet is placed only when the distribution's top score is strictly
//! above the threshold. The bet plays the `top_k` best-scoring numbers,
//! ties going to the lower number.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::config::StrategyConfig;
use crate::types::{BetDecision, Distribution};

/// Policy parameters (defaults mirror `config.toml`).
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub confidence_threshold: f64,
    pub top_k: usize,
    pub stake: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            top_k: 5,
            stake: dec!(0.01),
        }
    }
}

impl From<&StrategyConfig> for PolicyConfig {
    fn from(cfg: &StrategyConfig) -> Self {
        Self {
            confidence_threshold: cfg.confidence_threshold,
            top_k: cfg.top_k,
            stake: cfg.stake,
        }
    }
}

pub struct DecisionPolicy {
    config: PolicyConfig,
}

impl DecisionPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn decide(&self, distribution: &Distribution) -> BetDecision {
        let confidence = distribution.confidence();

        if confidence <= self.config.confidence_threshold {
            debug!(
                confidence = %format!("{:.1}%", confidence * 100.0),
                threshold = %format!("{:.1}%", self.config.confidence_threshold * 100.0),
                "Confidence below threshold"
            );
            return BetDecision::Skip { confidence };
        }

        let numbers = distribution.top_k(self.config.top_k);
        debug!(
            numbers = ?numbers,
            confidence = %format!("{:.1}%", confidence * 100.0),
            "Bet selected"
        );

        BetDecision::Place {
            numbers,
            stake: self.config.stake,
            confidence,
        }
    }
}
