//! Exchange integration.
//!
//! Defines the `ExchangeClient` trait consumed by the decision loop and
//! the HTTP implementation that talks to the betting service.
//!
//! Nothing here raises past the trait boundary: transport failures,
//! bad statuses and malformed payloads are logged by the implementation
//! and surface as an empty history, `None` bet or `None` balance.

pub mod http;
pub mod signing;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{BetResult, Round};

/// Failures inside an exchange call. Never crosses the trait boundary.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to sign request")]
    Signing,
}

/// Abstraction over the betting service.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Most recent rounds, oldest first. Empty on any failure.
    async fn fetch_history(&self, limit: u32) -> Vec<Round>;

    /// Place a bet on `numbers`. `None` on any failure.
    async fn place_bet(&self, numbers: &[u8], stake: Decimal, currency: &str)
        -> Option<BetResult>;

    /// Available balance in `currency`. `None` on any failure.
    async fn fetch_balance(&self, currency: &str) -> Option<Decimal>;

    /// Client name for logging.
    fn name(&self) -> &str;
}
