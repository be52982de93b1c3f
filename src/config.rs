//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (session token, signing secret) are referenced by env-var name
//! in the config and resolved at startup via `std::env::var`. Each
//! component is handed its own section; nothing reads the environment
//! after `main` has built the config.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

/// Longest pause between cycles the loop accepts, in seconds.
pub const MAX_PACING_SECS: f64 = 3600.0;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub pacing: PacingConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Balance shown until the exchange reports a real one.
    pub initial_balance: Decimal,
    /// Rounds requested from the exchange each cycle.
    pub poll_limit: u32,
    /// Seed for every randomness source. Unset means OS entropy.
    pub seed: Option<u64>,
    /// Log destination while the terminal view owns the screen.
    pub log_file: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1.0),
            poll_limit: 10,
            seed: None,
            log_file: "kenobot.log".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub token_env: String,
    pub secret_env: String,
    pub proxy_env: String,
    pub currency: String,
    pub history_timeout_secs: u64,
    pub bet_timeout_secs: u64,
    /// Bounds in milliseconds of the random delay before each request.
    pub request_jitter_ms: [u64; 2],
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stake.com".to_string(),
            token_env: "STAKE_TOKEN".to_string(),
            secret_env: "API_SECRET".to_string(),
            proxy_env: "PROXY_URL".to_string(),
            currency: "btc".to_string(),
            history_timeout_secs: 10,
            bet_timeout_secs: 8,
            request_jitter_ms: [1200, 3500],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    /// Stake per bet.
    pub stake: Decimal,
    /// Bet only when the top score is strictly above this.
    pub confidence_threshold: f64,
    /// Lookback length L.
    pub window_len: usize,
    /// Numbers played per bet, K.
    pub top_k: usize,
    /// Size of the number pool, N.
    pub number_pool: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stake: dec!(0.01),
            confidence_threshold: 0.85,
            window_len: 50,
            top_k: 5,
            number_pool: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PacingConfig {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_secs: 2.8,
            max_secs: 4.2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Rounds fetched for the initial training pass.
    pub training_rounds: u32,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Per-step decay of the recurrent state.
    pub decay: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            training_rounds: 500,
            epochs: 10,
            learning_rate: 0.1,
            decay: 0.9,
        }
    }
}

/// Secrets needed to talk to the exchange.
#[derive(Debug)]
pub struct SessionCredentials {
    pub token: SecretString,
    pub signing_secret: SecretString,
    pub proxy_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;
        if s.number_pool == 0 || s.number_pool > usize::from(u8::MAX) + 1 {
            bail!("strategy.number_pool must be in 1..=256, got {}", s.number_pool);
        }
        if s.top_k == 0 || s.top_k > s.number_pool {
            bail!(
                "strategy.top_k must be in 1..={}, got {}",
                s.number_pool,
                s.top_k
            );
        }
        if s.window_len == 0 {
            bail!("strategy.window_len must be positive");
        }
        if !(0.0..=1.0).contains(&s.confidence_threshold) {
            bail!(
                "strategy.confidence_threshold must be within [0, 1], got {}",
                s.confidence_threshold
            );
        }
        if s.stake <= Decimal::ZERO {
            bail!("strategy.stake must be positive");
        }
        let p = &self.pacing;
        if !p.min_secs.is_finite() || !p.max_secs.is_finite() {
            bail!(
                "pacing bounds must be finite, got [{}, {}]",
                p.min_secs,
                p.max_secs
            );
        }
        if p.max_secs > MAX_PACING_SECS {
            bail!(
                "pacing.max_secs must be at most {MAX_PACING_SECS}, got {}",
                p.max_secs
            );
        }
        if p.min_secs < 0.0 || p.min_secs > p.max_secs {
            bail!(
                "pacing bounds must satisfy 0 <= min <= max, got [{}, {}]",
                p.min_secs,
                p.max_secs
            );
        }
        let [lo, hi] = self.exchange.request_jitter_ms;
        if lo > hi {
            bail!("exchange.request_jitter_ms must be ordered, got [{lo}, {hi}]");
        }
        if !(0.0..1.0).contains(&self.model.decay) {
            bail!("model.decay must be within [0, 1), got {}", self.model.decay);
        }
        Ok(())
    }

    /// Resolve the exchange secrets named in the config.
    pub fn credentials(&self) -> Result<SessionCredentials> {
        let token = Self::resolve_env(&self.exchange.token_env)?;
        let secret = Self::resolve_env(&self.exchange.secret_env)?;
        let proxy_url = std::env::var(&self.exchange.proxy_env)
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(SessionCredentials {
            token: SecretString::new(token),
            signing_secret: SecretString::new(secret),
            proxy_url,
        })
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
