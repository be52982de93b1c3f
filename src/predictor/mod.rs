//! Sequence prediction.
//!
//! A `Predictor` maps a window of recent rounds to a `Distribution` over
//! the number pool. Training is best-effort: the loop logs a failed
//! training pass and carries on with whatever state the model has, which
//! for a fresh model is the uniform distribution.

pub mod recency;

use thiserror::Error;

use crate::types::{Distribution, PredictionWindow, Round};

pub use recency::RecencyNet;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("expected rows of width {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("not enough rounds: have {have}, need {need}")]
    NotEnoughData { have: usize, need: usize },

    #[error("model produced non-finite values")]
    NonFinite,

    #[error("degenerate model output: {0}")]
    Degenerate(String),
}

/// Summary of one training pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub samples: usize,
    pub epochs: usize,
    /// Mean cross-entropy over the last epoch.
    pub final_loss: f64,
}

/// Window → distribution model.
#[cfg_attr(test, mockall::automock)]
pub trait Predictor: Send {
    /// Fit the model on the full history, oldest round first.
    fn train(&mut self, history: &[Round]) -> Result<TrainingReport, ModelError>;

    /// Score every number in the pool for the round after `window`.
    fn predict(&self, window: &PredictionWindow) -> Result<Distribution, ModelError>;

    fn is_trained(&self) -> bool;
}
