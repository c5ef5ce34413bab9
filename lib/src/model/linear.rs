use std::sync::atomic::{AtomicBool, Ordering};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::debug;

use crate::error::TrainError;

use super::{split_dataset, DataBatch, ExponentialAverage, MetricsSnapshot, ModelConfig, Row, Scaler};

/// Weights, bias, feature scaling and the metrics they were evaluated to.
/// Produced off to the side by [`run_model`] and installed as one value.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedState {
  weights: Vec<f32>,
  bias: f32,
  scaler: Scaler,
  metrics: MetricsSnapshot,
}

impl TrainedState {
  pub fn predict(&self, features: &[f32]) -> f32 {
    predict_scaled(&self.weights, self.bias, &self.scaler.apply(features))
  }

  pub fn metrics(&self) -> &MetricsSnapshot {
    &self.metrics
  }
}

fn predict_scaled(weights: &[f32], bias: f32, x: &[f32]) -> f32 {
  weights.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + bias
}

/// Linear regression fitted with per-sample SGD on squared error.
///
/// Deterministic for a given batch and config: initial weights and the
/// per-epoch shuffle both come from `config.seed`. `cancel` is polled before
/// every step.
pub fn run_model(
  batch: &DataBatch,
  config: &ModelConfig,
  cancel: &AtomicBool,
) -> Result<TrainedState, TrainError> {
  batch.validate(config.input_dimension)?;
  let dim = config.input_dimension;
  let mut rng = StdRng::seed_from_u64(config.seed);

  let (training_rows, holdout_rows) = split_dataset(batch.rows(), config.split_ratio);
  let scaler = Scaler::fit(training_rows.iter().map(|row| &row[..dim]), dim);
  let training = scale_rows(&scaler, training_rows, dim);
  let holdout = scale_rows(&scaler, holdout_rows, dim);

  let mut weights: Vec<f32> = (0..dim).map(|_| rng.gen_range(-0.1..0.1)).collect();
  let mut bias = 0.0f32;
  let mut order: Vec<usize> = (0..training.len()).collect();
  let mut loss_avg = ExponentialAverage::new(1.0);
  let lr = config.learning_rate;
  let start = std::time::Instant::now();
  let mut iter = 0usize;

  for epoch in 0..config.epochs {
    order.shuffle(&mut rng);
    for &i in &order {
      if cancel.load(Ordering::Relaxed) {
        return Err(TrainError::Cancelled);
      }
      let (x, y) = &training[i];
      let err = predict_scaled(&weights, bias, x) - y;
      let grad = 2.0 * err;
      for (w, v) in weights.iter_mut().zip(x) {
        *w -= lr * grad * v;
      }
      bias -= lr * grad;
      loss_avg.update(err * err);
      iter += 1;
    }
    if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
      return Err(TrainError::Diverged { epoch });
    }
  }

  debug!(
    iterations = iter,
    elapsed_us = start.elapsed().as_micros() as u64,
    "linear model fitted"
  );

  let (loss, accuracy) = evaluate(&weights, bias, &training);
  if !loss.is_finite() || !loss_avg.value.is_finite() {
    return Err(TrainError::Diverged {
      epoch: config.epochs,
    });
  }
  let mut metrics = vec![
    ("samples".to_string(), batch.len() as f64),
    ("epochs".to_string(), config.epochs as f64),
    ("loss".to_string(), loss),
    ("loss_avg".to_string(), loss_avg.value as f64),
    ("accuracy".to_string(), accuracy),
  ];
  if !holdout.is_empty() {
    let (holdout_loss, holdout_accuracy) = evaluate(&weights, bias, &holdout);
    metrics.push(("holdout_loss".to_string(), holdout_loss));
    metrics.push(("holdout_accuracy".to_string(), holdout_accuracy));
  }

  Ok(TrainedState {
    weights,
    bias,
    scaler,
    metrics: metrics.into_iter().collect(),
  })
}

fn scale_rows(scaler: &Scaler, rows: &[Row], dim: usize) -> Vec<(Vec<f32>, f32)> {
  rows
    .iter()
    .map(|row| (scaler.apply(&row[..dim]), row[dim]))
    .collect()
}

/// Mean squared error and the share of predictions within 0.5 of the target.
fn evaluate(weights: &[f32], bias: f32, samples: &[(Vec<f32>, f32)]) -> (f64, f64) {
  if samples.is_empty() {
    return (0.0, 0.0);
  }
  let n = samples.len() as f64;
  let (sq_sum, hits) = samples.iter().fold((0.0f64, 0usize), |(sq, hits), (x, y)| {
    let err = (predict_scaled(weights, bias, x) - y) as f64;
    (sq + err * err, hits + usize::from(err.abs() < 0.5))
  });
  (sq_sum / n, hits as f64 / n)
}
