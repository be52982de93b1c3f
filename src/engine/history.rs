//! Append-only round history owned by the decision loop.

use std::collections::HashSet;
use tracing::warn;

use crate::types::{BetResult, PredictionWindow, Round};

/// Ordered round log, oldest first. Rounds are only ever appended. A
/// fetched round id is never appended twice; every settled bet adds a row.
#[derive(Debug, Default)]
pub struct History {
    rounds: Vec<Round>,
    known: HashSet<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn last(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Append a round unless its id is already present. Returns whether it
    /// was appended.
    pub fn push(&mut self, round: Round) -> bool {
        if !self.known.insert(round.id.clone()) {
            return false;
        }
        self.rounds.push(round);
        true
    }

    /// Append the unseen rounds of an oldest-first batch. Returns how many
    /// were appended.
    pub fn merge(&mut self, batch: Vec<Round>) -> usize {
        let mut appended = 0;
        for round in batch {
            if self.push(round) {
                appended += 1;
            }
        }
        appended
    }

    /// Record the round a settled bet played in. Always appends, even if
    /// the exchange reports an id it has used before.
    pub fn record_bet(&mut self, bet: &BetResult) {
        let round = Round::from(bet);
        if !self.known.insert(round.id.clone()) {
            warn!(bet_id = %bet.id, "Exchange reused a bet id");
        }
        self.rounds.push(round);
    }

    /// The last `lookback` rounds as model input.
    pub fn window(&self, lookback: usize, pool: usize) -> PredictionWindow {
        PredictionWindow::from_rounds(&self.rounds, lookback, pool)
    }
}
