//! Recency-weighted recurrent scorer.
//!
//! Three layers: the multi-hot round vectors of the window, a recurrent
//! state `h_t = decay * h_{t-1} + x_t` folded over the window, and a dense
//! softmax layer over the number pool. Only the dense layer is trained,
//! by mini-batch gradient descent on cross-entropy against the next
//! round's normalised draw.
//!
//! Fresh weights are zero, so an untrained net returns the uniform
//! distribution and never clears a sensible confidence threshold.

use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info};

use super::{ModelError, Predictor, TrainingReport};
use crate::config::ModelConfig;
use crate::types::{Distribution, PredictionWindow, Round};

const BATCH_SIZE: usize = 32;

pub struct RecencyNet {
    pool: usize,
    lookback: usize,
    decay: f64,
    learning_rate: f64,
    epochs: usize,
    weights: Array2<f64>,
    bias: Array1<f64>,
    trained: bool,
}

impl RecencyNet {
    pub fn new(pool: usize, lookback: usize, cfg: &ModelConfig) -> Self {
        Self {
            pool,
            lookback,
            decay: cfg.decay,
            learning_rate: cfg.learning_rate,
            epochs: cfg.epochs,
            weights: Array2::zeros((pool, pool)),
            bias: Array1::zeros(pool),
            trained: false,
        }
    }

    /// Fold the window through the recurrent layer. Scaled by `1 - decay`
    /// so a number drawn every round saturates near one.
    fn state(&self, rows: &[Vec<f64>]) -> Result<Array1<f64>, ModelError> {
        let mut h = Array1::<f64>::zeros(self.pool);
        for row in rows {
            if row.len() != self.pool {
                return Err(ModelError::ShapeMismatch {
                    expected: self.pool,
                    actual: row.len(),
                });
            }
            h *= self.decay;
            h += &Array1::from(row.clone());
        }
        h *= 1.0 - self.decay;
        Ok(h)
    }

    fn forward(&self, h: &Array1<f64>) -> Array1<f64> {
        softmax(&(self.weights.dot(h) + &self.bias))
    }

    /// (state, target) pairs: each window of `lookback` rounds predicts the
    /// round that follows it.
    fn samples(&self, history: &[Round]) -> Result<Vec<(Array1<f64>, Array1<f64>)>, ModelError> {
        let mut out = Vec::new();
        for t in self.lookback..history.len() {
            let target = history[t].encode(self.pool);
            let hits: f64 = target.iter().sum();
            if hits == 0.0 {
                continue;
            }
            let window = PredictionWindow::from_rounds(&history[..t], self.lookback, self.pool);
            let h = self.state(window.rows())?;
            out.push((h, Array1::from(target) / hits));
        }
        Ok(out)
    }
}

fn softmax(z: &Array1<f64>) -> Array1<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = z.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

fn cross_entropy(p: &Array1<f64>, y: &Array1<f64>) -> f64 {
    -y.iter()
        .zip(p.iter())
        .filter(|(t, _)| **t > 0.0)
        .map(|(t, q)| t * q.max(f64::MIN_POSITIVE).ln())
        .sum::<f64>()
}

impl Predictor for RecencyNet {
    fn train(&mut self, history: &[Round]) -> Result<TrainingReport, ModelError> {
        let samples = self.samples(history)?;
        if samples.is_empty() {
            return Err(ModelError::NotEnoughData {
                have: history.len(),
                need: self.lookback + 1,
            });
        }

        let mut weights = self.weights.clone();
        let mut bias = self.bias.clone();
        let mut final_loss = f64::NAN;

        for epoch in 0..self.epochs {
            let mut epoch_loss = 0.0;
            for batch in samples.chunks(BATCH_SIZE) {
                let mut grad_w = Array2::<f64>::zeros((self.pool, self.pool));
                let mut grad_b = Array1::<f64>::zeros(self.pool);
                for (h, y) in batch {
                    let p = softmax(&(weights.dot(h) + &bias));
                    epoch_loss += cross_entropy(&p, y);
                    let g = &p - y;
                    grad_w += &g
                        .view()
                        .insert_axis(Axis(1))
                        .dot(&h.view().insert_axis(Axis(0)));
                    grad_b += &g;
                }
                let scale = self.learning_rate / batch.len() as f64;
                weights.scaled_add(-scale, &grad_w);
                bias.scaled_add(-scale, &grad_b);
            }
            final_loss = epoch_loss / samples.len() as f64;
            debug!(epoch, loss = final_loss, "Training epoch complete");
        }

        if !final_loss.is_finite() && self.epochs > 0 {
            return Err(ModelError::NonFinite);
        }
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        self.weights = weights;
        self.bias = bias;
        self.trained = true;

        info!(
            samples = samples.len(),
            epochs = self.epochs,
            loss = final_loss,
            "Model trained"
        );

        Ok(TrainingReport {
            samples: samples.len(),
            epochs: self.epochs,
            final_loss,
        })
    }

    fn predict(&self, window: &PredictionWindow) -> Result<Distribution, ModelError> {
        if window.is_empty() {
            return Err(ModelError::NotEnoughData {
                have: 0,
                need: self.lookback,
            });
        }
        let h = self.state(window.rows())?;
        Distribution::new(self.forward(&h).to_vec())
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
