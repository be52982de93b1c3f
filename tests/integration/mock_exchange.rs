//! Mock exchange and recording renderer for integration testing.
//!
//! Provides a deterministic `ExchangeClient` implementation that serves
//! a controllable round history, settles bets, and reports a balance,
//! all in-memory with no external dependencies. Handles are cheap clones
//! sharing state, so tests keep one while the loop owns another.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

use kenobot::display::Renderer;
use kenobot::exchange::ExchangeClient;
use kenobot::predictor::{ModelError, Predictor, TrainingReport};
use kenobot::types::{BetResult, Distribution, PredictionWindow, Round};

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ExchangeState {
    rounds: Vec<Round>,
    balance: Option<Decimal>,
    fail_history: bool,
    fail_bets: bool,
    fixed_bet_id: Option<String>,
    history_calls: usize,
    bets: Vec<(Vec<u8>, Decimal, String)>,
}

#[derive(Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<ExchangeState>>,
}

impl MockExchange {
    /// Exchange serving `n` rounds; round `i` drew number `i % 20`.
    pub fn with_rounds(n: usize) -> Self {
        let ex = Self::default();
        ex.state.lock().unwrap().rounds = rounds(0, n);
        ex
    }

    /// Append rounds to what the exchange serves.
    pub fn publish(&self, more: Vec<Round>) {
        self.state.lock().unwrap().rounds.extend(more);
    }

    pub fn set_balance(&self, balance: Option<Decimal>) {
        self.state.lock().unwrap().balance = balance;
    }

    pub fn fail_history(&self, fail: bool) {
        self.state.lock().unwrap().fail_history = fail;
    }

    pub fn fail_bets(&self, fail: bool) {
        self.state.lock().unwrap().fail_bets = fail;
    }

    /// Settle every later bet under this id instead of a fresh one.
    pub fn fix_bet_id(&self, id: &str) {
        self.state.lock().unwrap().fixed_bet_id = Some(id.to_string());
    }

    /// Every bet request received, successful or not.
    pub fn bets(&self) -> Vec<(Vec<u8>, Decimal, String)> {
        self.state.lock().unwrap().bets.clone()
    }

    pub fn history_calls(&self) -> usize {
        self.state.lock().unwrap().history_calls
    }
}

pub fn rounds(from: usize, to: usize) -> Vec<Round> {
    (from..to)
        .map(|i| Round::new(format!("r{i}"), vec![(i % 20) as u8], 1.0))
        .collect()
}

#[async_trait]
impl ExchangeClient for MockExchange {
    async fn fetch_history(&self, limit: u32) -> Vec<Round> {
        let mut state = self.state.lock().unwrap();
        state.history_calls += 1;
        if state.fail_history {
            return Vec::new();
        }
        let start = state.rounds.len().saturating_sub(limit as usize);
        state.rounds[start..].to_vec()
    }

    async fn place_bet(
        &self,
        numbers: &[u8],
        stake: Decimal,
        currency: &str,
    ) -> Option<BetResult> {
        let mut state = self.state.lock().unwrap();
        state
            .bets
            .push((numbers.to_vec(), stake, currency.to_string()));
        if state.fail_bets {
            return None;
        }
        let id = state
            .fixed_bet_id
            .clone()
            .unwrap_or_else(|| format!("bet-{}", state.bets.len()));
        Some(BetResult {
            id,
            numbers: numbers.to_vec(),
            drawn: vec![0, 1, 2],
            multiplier: 0.0,
            stake,
            payout: Decimal::ZERO,
            settled_at: Utc::now(),
        })
    }

    async fn fetch_balance(&self, _currency: &str) -> Option<Decimal> {
        self.state.lock().unwrap().balance
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// Always answers the same distribution and remembers every window.
#[derive(Clone)]
pub struct FixedPredictor {
    answer: Distribution,
    windows: Arc<Mutex<Vec<PredictionWindow>>>,
}

impl FixedPredictor {
    pub fn new(answer: Distribution) -> Self {
        Self {
            answer,
            windows: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn windows(&self) -> Vec<PredictionWindow> {
        self.windows.lock().unwrap().clone()
    }
}

impl Predictor for FixedPredictor {
    fn train(&mut self, history: &[Round]) -> Result<TrainingReport, ModelError> {
        Ok(TrainingReport {
            samples: history.len(),
            epochs: 0,
            final_loss: 0.0,
        })
    }

    fn predict(&self, window: &PredictionWindow) -> Result<Distribution, ModelError> {
        self.windows.lock().unwrap().push(window.clone());
        Ok(self.answer.clone())
    }

    fn is_trained(&self) -> bool {
        true
    }
}

/// Distribution over 20 numbers with `top` at index `at`, rest even.
pub fn peaked(top: f64, at: usize) -> Distribution {
    let mut raw = vec![(1.0 - top) / 19.0; 20];
    raw[at] = top;
    Distribution::new(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub balance: Decimal,
    pub recent: Vec<BetResult>,
    pub distribution: Option<Distribution>,
}

#[derive(Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingRenderer {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, balance: Decimal, recent: &[BetResult], distribution: Option<&Distribution>) {
        self.frames.lock().unwrap().push(Frame {
            balance,
            recent: recent.to_vec(),
            distribution: distribution.cloned(),
        });
    }
}
