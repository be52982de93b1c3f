//! Shared types for the KENOBOT loop.
//!
//! These types form the data model used across all modules. Rounds and
//! bet results are validated at the exchange boundary, so everything
//! downstream can rely on numbers lying inside the configured pool.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::predictor::ModelError;

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// One historical outcome of the game: the drawn numbers and the
/// multiplier the round paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    /// Drawn numbers, each in `0..number_pool`.
    pub numbers: Vec<u8>,
    pub multiplier: f64,
    pub received_at: DateTime<Utc>,
}

impl Round {
    pub fn new(id: impl Into<String>, numbers: Vec<u8>, multiplier: f64) -> Self {
        Self {
            id: id.into(),
            numbers,
            multiplier,
            received_at: Utc::now(),
        }
    }

    /// Multi-hot encoding of the drawn numbers over a pool of `pool` numbers.
    /// Out-of-range numbers are ignored.
    pub fn encode(&self, pool: usize) -> Vec<f64> {
        let mut hot = vec![0.0; pool];
        for &n in &self.numbers {
            if let Some(slot) = hot.get_mut(n as usize) {
                *slot = 1.0;
            }
        }
        hot
    }

    /// Whether every number lies in `0..pool`.
    pub fn fits_pool(&self, pool: usize) -> bool {
        self.numbers.iter().all(|&n| (n as usize) < pool)
    }
}

/// Bet rows live under their own id prefix so they never collide with
/// fetched round ids. Without a reported draw, the row holds the picks.
impl From<&BetResult> for Round {
    fn from(bet: &BetResult) -> Self {
        let numbers = if bet.drawn.is_empty() {
            bet.numbers.clone()
        } else {
            bet.drawn.clone()
        };
        Self {
            id: format!("bet:{}", bet.id),
            numbers,
            multiplier: bet.multiplier,
            received_at: bet.settled_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Bet result
// ---------------------------------------------------------------------------

/// Settlement of one placed bet as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetResult {
    pub id: String,
    /// Numbers we played.
    pub numbers: Vec<u8>,
    /// Numbers the round drew. May be empty if the exchange omits them.
    pub drawn: Vec<u8>,
    pub multiplier: f64,
    pub stake: Decimal,
    pub payout: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl BetResult {
    /// How many of our picks were drawn.
    pub fn hits(&self) -> usize {
        self.numbers.iter().filter(|n| self.drawn.contains(n)).count()
    }

    pub fn is_win(&self) -> bool {
        self.payout > self.stake
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} → {:.2}x", self.numbers, self.multiplier)
    }
}

// ---------------------------------------------------------------------------
// Prediction window
// ---------------------------------------------------------------------------

/// The most recent rounds' number vectors, oldest first. Never holds more
/// than the lookback it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionWindow {
    rows: Vec<Vec<f64>>,
    lookback: usize,
}

impl PredictionWindow {
    /// Build a window from the tail of `rounds`, keeping at most `lookback`
    /// entries.
    pub fn from_rounds(rounds: &[Round], lookback: usize, pool: usize) -> Self {
        let start = rounds.len().saturating_sub(lookback);
        let rows = rounds[start..].iter().map(|r| r.encode(pool)).collect();
        Self { rows, lookback }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// True once the window holds a full lookback of rounds.
    pub fn is_full(&self) -> bool {
        self.rows.len() == self.lookback
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Normalised per-number selection scores. Index `i` scores number `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    scores: Vec<f64>,
}

impl Distribution {
    /// Normalise raw non-negative scores so they sum to one.
    pub fn new(raw: Vec<f64>) -> Result<Self, ModelError> {
        if raw.is_empty() {
            return Err(ModelError::Degenerate("empty score vector".into()));
        }
        if raw.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ModelError::NonFinite);
        }
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Err(ModelError::Degenerate("scores sum to zero".into()));
        }
        Ok(Self {
            scores: raw.into_iter().map(|s| s / total).collect(),
        })
    }

    /// Equal score for every number. What an untrained model says.
    pub fn uniform(pool: usize) -> Self {
        let pool = pool.max(1);
        Self {
            scores: vec![1.0 / pool as f64; pool],
        }
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The largest score, used as the bet/skip gate.
    pub fn confidence(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }

    /// Indices of the `k` highest scores, best first. Ties go to the lower
    /// index.
    pub fn top_k(&self, k: usize) -> Vec<u8> {
        let mut ranked: Vec<(usize, f64)> = self.scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(k).map(|(i, _)| i as u8).collect()
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.scores.iter().map(|s| format!("{s:.2}")).collect();
        write!(f, "[{}]", parts.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Decisions and outcomes
// ---------------------------------------------------------------------------

/// What the policy wants done this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum BetDecision {
    Skip { confidence: f64 },
    Place { numbers: Vec<u8>, stake: Decimal, confidence: f64 },
}

impl BetDecision {
    pub fn is_bet(&self) -> bool {
        matches!(self, BetDecision::Place { .. })
    }
}

/// Why a cycle did not bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The history fetch came back empty.
    NoUpdate,
    /// Fewer rounds than the lookback window.
    InsufficientHistory { have: usize, need: usize },
    /// The model failed to produce a distribution.
    ModelFailure,
    /// Confidence did not clear the threshold.
    LowConfidence,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientHistory { have, need } => {
                write!(f, "insufficient history ({have}/{need})")
            }
            SkipReason::NoUpdate => write!(f, "no history update"),
            SkipReason::ModelFailure => write!(f, "model failure"),
            SkipReason::LowConfidence => write!(f, "low confidence"),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    BetPlaced(BetResult),
    BetFailed { numbers: Vec<u8> },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
