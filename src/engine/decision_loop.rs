//! The fetch → predict → decide → bet → render → pace cycle.
//!
//! Cycles run strictly one after another. A cycle never fails: exchange
//! calls come back as sentinels, an empty fetch or a model error degrades
//! to a skip, and the outcome is reported in a `CycleReport`. The only
//! exit is the shutdown future passed to `run_until`, which is raced
//! against both the cycle and the pacing sleep.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use tracing::{info, warn};

use super::history::History;
use super::pacing::Pacer;
use crate::config::AppConfig;
use crate::display::{Renderer, RECENT_BETS};
use crate::exchange::ExchangeClient;
use crate::predictor::{Predictor, TrainingReport};
use crate::strategy::DecisionPolicy;
use crate::types::{BetDecision, BetResult, CycleOutcome, Distribution, SkipReason};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_len: usize,
    pub number_pool: usize,
    pub poll_limit: u32,
    pub training_rounds: u32,
    pub currency: String,
    pub initial_balance: Decimal,
}

impl From<&AppConfig> for LoopConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            window_len: cfg.strategy.window_len,
            number_pool: cfg.strategy.number_pool,
            poll_limit: cfg.agent.poll_limit,
            training_rounds: cfg.model.training_rounds,
            currency: cfg.exchange.currency.clone(),
            initial_balance: cfg.agent.initial_balance,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between cycles; no network call pending.
    Idle,
    /// A cycle is in progress.
    Active,
}

/// Summary of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub rounds_fetched: usize,
    pub rounds_appended: usize,
    pub history_len: usize,
    pub confidence: Option<f64>,
    pub outcome: CycleOutcome,
    pub balance: Decimal,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Decision loop
// ---------------------------------------------------------------------------

pub struct DecisionLoop<E, P, R> {
    exchange: E,
    predictor: P,
    renderer: R,
    policy: DecisionPolicy,
    pacer: Pacer,
    config: LoopConfig,
    history: History,
    recent: Vec<BetResult>,
    balance: Decimal,
    cycle_count: u64,
    state: LoopState,
}

impl<E, P, R> DecisionLoop<E, P, R>
where
    E: ExchangeClient,
    P: Predictor,
    R: Renderer,
{
    pub fn new(
        exchange: E,
        predictor: P,
        renderer: R,
        policy: DecisionPolicy,
        pacer: Pacer,
        config: LoopConfig,
    ) -> Self {
        Self {
            balance: config.initial_balance,
            exchange,
            predictor,
            renderer,
            policy,
            pacer,
            config,
            history: History::new(),
            recent: Vec::new(),
            cycle_count: 0,
            state: LoopState::Idle,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn recent_bets(&self) -> &[BetResult] {
        &self.recent
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Seed the history and run the initial training pass. Training
    /// failure is logged; the loop runs on with an untrained model.
    pub async fn bootstrap(&mut self) -> Option<TrainingReport> {
        let rounds = self.exchange.fetch_history(self.config.training_rounds).await;
        let appended = self.history.merge(rounds);
        info!(appended, history = self.history.len(), "History seeded");

        match self.predictor.train(self.history.rounds()) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Initial training failed; continuing untrained");
                None
            }
        }
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.state = LoopState::Active;

        // 1. Fetch and merge new rounds
        let fetched = self.exchange.fetch_history(self.config.poll_limit).await;
        let rounds_fetched = fetched.len();
        let rounds_appended = self.history.merge(fetched);

        // 2-4. Window → predict → decide → bet, only on fresh data
        let (distribution, outcome) = if rounds_fetched == 0 {
            (None, CycleOutcome::Skipped(SkipReason::NoUpdate))
        } else {
            self.decide_and_bet().await
        };

        // 5. Balance, falling back to the last known value
        if let Some(balance) = self.exchange.fetch_balance(&self.config.currency).await {
            self.balance = balance;
        }

        // 6. Render
        self.renderer
            .render(self.balance, &self.recent, distribution.as_ref());

        self.cycle_count += 1;
        self.state = LoopState::Idle;

        CycleReport {
            cycle_number: self.cycle_count,
            rounds_fetched,
            rounds_appended,
            history_len: self.history.len(),
            confidence: distribution.as_ref().map(Distribution::confidence),
            outcome,
            balance: self.balance,
            timestamp: Utc::now(),
        }
    }

    async fn decide_and_bet(&mut self) -> (Option<Distribution>, CycleOutcome) {
        let window = self
            .history
            .window(self.config.window_len, self.config.number_pool);
        if !window.is_full() {
            let reason = SkipReason::InsufficientHistory {
                have: window.len(),
                need: self.config.window_len,
            };
            return (None, CycleOutcome::Skipped(reason));
        }

        let distribution = match self.predictor.predict(&window) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Prediction failed; skipping bet");
                return (None, CycleOutcome::Skipped(SkipReason::ModelFailure));
            }
        };

        let outcome = match self.policy.decide(&distribution) {
            BetDecision::Skip { .. } => CycleOutcome::Skipped(SkipReason::LowConfidence),
            BetDecision::Place { numbers, stake, .. } => {
                match self
                    .exchange
                    .place_bet(&numbers, stake, &self.config.currency)
                    .await
                {
                    Some(bet) => {
                        self.history.record_bet(&bet);
                        self.recent.push(bet.clone());
                        if self.recent.len() > RECENT_BETS {
                            self.recent.remove(0);
                        }
                        CycleOutcome::BetPlaced(bet)
                    }
                    None => CycleOutcome::BetFailed { numbers },
                }
            }
        };

        (Some(distribution), outcome)
    }

    /// Cycle and pace until `shutdown` resolves. Returns the number of
    /// completed cycles.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let started = self.cycle_count;

        loop {
            tokio::select! {
                report = self.run_cycle() => log_cycle_report(&report),
                _ = &mut shutdown => break,
            }

            let delay = self.pacer.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => break,
            }
        }

        self.state = LoopState::Idle;
        info!(cycles = self.cycle_count - started, "Decision loop stopped");
        self.cycle_count - started
    }
}

/// Log a human-readable cycle summary.
pub fn log_cycle_report(report: &CycleReport) {
    let outcome = match &report.outcome {
        CycleOutcome::Skipped(reason) => format!("skipped: {reason}"),
        CycleOutcome::BetPlaced(bet) => format!("bet {bet}"),
        CycleOutcome::BetFailed { numbers } => format!("bet failed: {numbers:?}"),
    };
    info!(
        cycle = report.cycle_number,
        fetched = report.rounds_fetched,
        appended = report.rounds_appended,
        history = report.history_len,
        confidence = report.confidence.map(|c| format!("{:.1}%", c * 100.0)),
        balance = %report.balance,
        outcome = %outcome,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
