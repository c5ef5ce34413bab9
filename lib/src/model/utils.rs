use std::path::Path;

use crate::error::{DatasetError, ValidationError};

use super::{DataBatch, Row};

/// Whitespace separated values, one sample per line, target last.
pub fn parse_dataset(content: &str) -> Result<DataBatch, ValidationError> {
  let mut rows: Vec<Row> = Vec::new();
  for (lineno, line) in content.lines().enumerate() {
    if line.trim().is_empty() {
      continue;
    }
    let parts = line
      .split_whitespace()
      .map(|val| val.parse::<f32>())
      .collect::<Result<Row, _>>()
      .map_err(|e| ValidationError::Malformed(format!("line {}: {}", lineno + 1, e)))?;
    rows.push(parts);
  }
  Ok(DataBatch::new(rows))
}

pub fn read_dataset(path: &Path) -> Result<DataBatch, DatasetError> {
  let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
    path: path.display().to_string(),
    source,
  })?;
  Ok(parse_dataset(&content)?)
}

/// Splits at `len * ratio`, keeping at least one row on the training side.
pub fn split_dataset(rows: &[Row], ratio: f32) -> (&[Row], &[Row]) {
  let splitting_point =
    ((rows.len() as f32 * ratio) as usize).clamp(usize::min(1, rows.len()), rows.len());
  rows.split_at(splitting_point)
}

/// Min-max feature scaling fitted on the training split.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
  mins: Vec<f32>,
  ranges: Vec<f32>,
}

impl Scaler {
  pub fn fit<'a>(features: impl Iterator<Item = &'a [f32]>, dimension: usize) -> Self {
    let mut mins = vec![f32::INFINITY; dimension];
    let mut maxs = vec![f32::NEG_INFINITY; dimension];
    for x in features {
      for i in 0..dimension {
        mins[i] = f32::min(mins[i], x[i]);
        maxs[i] = f32::max(maxs[i], x[i]);
      }
    }
    let ranges = mins
      .iter()
      .zip(&maxs)
      .map(|(lo, hi)| {
        let range = hi - lo;
        if range.is_finite() && range > 0.0 {
          range
        } else {
          1.0
        }
      })
      .collect();
    let mins = mins
      .into_iter()
      .map(|m| if m.is_finite() { m } else { 0.0 })
      .collect();
    Self { mins, ranges }
  }

  pub fn apply(&self, x: &[f32]) -> Vec<f32> {
    x.iter()
      .zip(self.mins.iter().zip(&self.ranges))
      .map(|(v, (lo, range))| (v - lo) / range)
      .collect()
  }
}

pub struct ExponentialAverage {
  beta: f32,
  moment: f32,
  pub value: f32,
  t: i32,
}

impl ExponentialAverage {
  pub fn new(initial: f32) -> Self {
    ExponentialAverage {
      beta: 0.999,
      moment: 0.,
      value: initial,
      t: 0,
    }
  }

  pub fn update(&mut self, value: f32) {
    self.t += 1;
    self.moment = self.beta * self.moment + (1. - self.beta) * value;
    // bias correction
    self.value = self.moment / (1. - f32::powi(self.beta, self.t));
  }
}
