//! HTTP exchange client.
//!
//! Endpoints (JSON over HTTPS):
//! - `POST /games/keno/history` `{ "limit": n }` → `{ "rounds": [...] }`, newest first
//! - `POST /games/keno/bet` signed payload → settled bet
//! - `GET  /user/balance?currency=..` → `{ "available": x }`
//!
//! Auth: `x-access-token` on every request; bets additionally carry
//! `x-request-signature`, the HMAC of the exact JSON body sent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::signing::{client_seed, sign_payload};
use super::{ExchangeClient, ExchangeError};
use crate::config::{ExchangeConfig, SessionCredentials};
use crate::types::{BetResult, Round};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const CLIENT_NAME: &str = "http";
const HISTORY_PATH: &str = "/games/keno/history";
const BET_PATH: &str = "/games/keno/bet";
const BALANCE_PATH: &str = "/user/balance";
const SIGNATURE_HEADER: &str = "x-request-signature";
const TOKEN_HEADER: &str = "x-access-token";
const BALANCE_TIMEOUT_SECS: u64 = 8;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HistoryRequest {
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    rounds: Vec<WireRound>,
}

#[derive(Debug, Deserialize)]
struct WireRound {
    id: String,
    numbers: Vec<i64>,
    multiplier: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BetRequest<'a> {
    amount: Decimal,
    currency: &'a str,
    numbers: &'a [u8],
    client_seed: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetResponse {
    #[serde(default)]
    id: Option<String>,
    numbers: Vec<i64>,
    #[serde(default)]
    drawn_numbers: Vec<i64>,
    multiplier: f64,
    #[serde(default)]
    payout: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    available: Decimal,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Exchange client backed by `reqwest`.
pub struct HttpExchangeClient {
    http: Client,
    base_url: String,
    signing_secret: SecretString,
    number_pool: usize,
    history_timeout: Duration,
    bet_timeout: Duration,
    jitter_ms: [u64; 2],
    rng: Mutex<StdRng>,
}

impl HttpExchangeClient {
    pub fn new(
        cfg: &ExchangeConfig,
        creds: SessionCredentials,
        number_pool: usize,
        rng: StdRng,
    ) -> Result<Self> {
        let mut token = HeaderValue::from_str(creds.token.expose_secret())
            .context("Session token is not a valid header value")?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(TOKEN_HEADER, token);

        let mut builder = Client::builder()
            .user_agent(concat!("kenobot/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        if let Some(url) = &creds.proxy_url {
            let proxy = reqwest::Proxy::all(url).context("Invalid proxy URL")?;
            builder = builder.proxy(proxy);
            info!("Routing exchange traffic through configured proxy");
        }

        let http = builder
            .build()
            .context("Failed to build HTTP client for exchange")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            signing_secret: creds.signing_secret,
            number_pool,
            history_timeout: Duration::from_secs(cfg.history_timeout_secs),
            bet_timeout: Duration::from_secs(cfg.bet_timeout_secs),
            jitter_ms: cfg.request_jitter_ms,
            rng: Mutex::new(rng),
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *rng)
    }

    /// Random pause before each request.
    async fn jitter(&self) {
        let [lo, hi] = self.jitter_ms;
        if hi == 0 {
            return;
        }
        let ms = self.with_rng(|rng| rng.gen_range(lo..=hi));
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn send(&self, req: RequestBuilder) -> Result<String, ExchangeError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Status { status, body });
        }
        Ok(body)
    }

    async fn try_fetch_history(&self, limit: u32) -> Result<Vec<Round>, ExchangeError> {
        self.jitter().await;
        let url = format!("{}{HISTORY_PATH}", self.base_url);
        debug!(url = %url, limit, "Fetching round history");

        let body = self
            .send(
                self.http
                    .post(&url)
                    .timeout(self.history_timeout)
                    .json(&HistoryRequest { limit }),
            )
            .await?;

        Self::parse_rounds(&body, self.number_pool)
    }

    async fn try_place_bet(
        &self,
        numbers: &[u8],
        stake: Decimal,
        currency: &str,
    ) -> Result<BetResult, ExchangeError> {
        self.jitter().await;
        let seed = self.with_rng(client_seed);
        let payload = Self::bet_body(numbers, stake, currency, seed)?;
        let signature = sign_payload(self.signing_secret.expose_secret(), &payload)?;

        let body = self
            .send(
                self.http
                    .post(format!("{}{BET_PATH}", self.base_url))
                    .timeout(self.bet_timeout)
                    .header(SIGNATURE_HEADER, signature)
                    .body(payload),
            )
            .await?;

        Self::parse_bet(&body, self.number_pool, stake)
    }

    async fn try_fetch_balance(&self, currency: &str) -> Result<Decimal, ExchangeError> {
        self.jitter().await;
        let body = self
            .send(
                self.http
                    .get(format!("{}{BALANCE_PATH}", self.base_url))
                    .query(&[("currency", currency)])
                    .timeout(Duration::from_secs(BALANCE_TIMEOUT_SECS)),
            )
            .await?;

        let balance: BalanceResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::InvalidPayload(e.to_string()))?;
        Ok(balance.available)
    }

    // -- Payload mapping -------------------------------------------------

    fn bet_body(
        numbers: &[u8],
        stake: Decimal,
        currency: &str,
        client_seed: String,
    ) -> Result<String, ExchangeError> {
        Ok(serde_json::to_string(&BetRequest {
            amount: stake,
            currency,
            numbers,
            client_seed,
        })?)
    }

    fn to_pool_numbers(raw: &[i64], pool: usize) -> Result<Vec<u8>, ExchangeError> {
        raw.iter()
            .map(|&n| {
                if n >= 0 && (n as usize) < pool {
                    Ok(n as u8)
                } else {
                    Err(ExchangeError::InvalidPayload(format!(
                        "number {n} outside pool 0..{pool}"
                    )))
                }
            })
            .collect()
    }

    /// Parse a history response into rounds, oldest first.
    fn parse_rounds(body: &str, pool: usize) -> Result<Vec<Round>, ExchangeError> {
        let resp: HistoryResponse = serde_json::from_str(body)
            .map_err(|e| ExchangeError::InvalidPayload(e.to_string()))?;

        let mut rounds = resp
            .rounds
            .into_iter()
            .map(|w| {
                if w.id.trim().is_empty() {
                    return Err(ExchangeError::InvalidPayload("round without id".into()));
                }
                if !w.multiplier.is_finite() {
                    return Err(ExchangeError::InvalidPayload(format!(
                        "round {} has non-finite multiplier",
                        w.id
                    )));
                }
                let numbers = Self::to_pool_numbers(&w.numbers, pool)?;
                Ok(Round::new(w.id, numbers, w.multiplier))
            })
            .collect::<Result<Vec<_>, _>>()?;

        rounds.reverse();
        Ok(rounds)
    }

    fn parse_bet(body: &str, pool: usize, stake: Decimal) -> Result<BetResult, ExchangeError> {
        let resp: BetResponse = serde_json::from_str(body)
            .map_err(|e| ExchangeError::InvalidPayload(e.to_string()))?;

        if resp.numbers.is_empty() {
            return Err(ExchangeError::InvalidPayload("bet echoed no numbers".into()));
        }
        if !resp.multiplier.is_finite() {
            return Err(ExchangeError::InvalidPayload("non-finite multiplier".into()));
        }

        let payout = resp.payout.unwrap_or_else(|| {
            stake * Decimal::from_f64_retain(resp.multiplier).unwrap_or(Decimal::ZERO)
        });

        Ok(BetResult {
            id: resp
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            numbers: Self::to_pool_numbers(&resp.numbers, pool)?,
            drawn: Self::to_pool_numbers(&resp.drawn_numbers, pool)?,
            multiplier: resp.multiplier,
            stake,
            payout,
            settled_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// ExchangeClient trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    async fn fetch_history(&self, limit: u32) -> Vec<Round> {
        match self.try_fetch_history(limit).await {
            Ok(rounds) => {
                debug!(count = rounds.len(), "Round history fetched");
                rounds
            }
            Err(e) => {
                warn!(error = %e, limit, "History fetch failed");
                Vec::new()
            }
        }
    }

    async fn place_bet(
        &self,
        numbers: &[u8],
        stake: Decimal,
        currency: &str,
    ) -> Option<BetResult> {
        match self.try_place_bet(numbers, stake, currency).await {
            Ok(bet) => {
                info!(
                    bet_id = %bet.id,
                    numbers = ?bet.numbers,
                    multiplier = bet.multiplier,
                    payout = %bet.payout,
                    "Bet settled"
                );
                Some(bet)
            }
            Err(e) => {
                warn!(error = %e, numbers = ?numbers, stake = %stake, "Bet failed");
                None
            }
        }
    }

    async fn fetch_balance(&self, currency: &str) -> Option<Decimal> {
        match self.try_fetch_balance(currency).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(error = %e, currency, "Balance check failed");
                None
            }
        }
    }

    fn name(&self) -> &str {
        CLIENT_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
