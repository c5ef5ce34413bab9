use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const INPUT_DIMENSION: usize = 9;

pub type Row = Vec<f32>;

/// Rows of `input_dimension` features followed by a single target value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBatch {
  rows: Vec<Row>,
}

impl DataBatch {
  pub fn new(rows: Vec<Row>) -> Self {
    Self { rows }
  }

  /// Parses the webhook wire format: a JSON array of numeric arrays.
  pub fn from_json(body: &str) -> Result<Self, ValidationError> {
    if body.trim().is_empty() {
      return Err(ValidationError::Empty);
    }
    serde_json::from_str(body).map_err(|e| ValidationError::Malformed(e.to_string()))
  }

  pub fn validate(&self, input_dimension: usize) -> Result<(), ValidationError> {
    if self.rows.is_empty() {
      return Err(ValidationError::Empty);
    }
    let expected = input_dimension + 1;
    for (row, values) in self.rows.iter().enumerate() {
      if values.len() != expected {
        return Err(ValidationError::RowWidth {
          row,
          expected,
          found: values.len(),
        });
      }
      if let Some(column) = values.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::NonFinite { row, column });
      }
    }
    Ok(())
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

/// Immutable read of a model's metrics, serialized as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSnapshot(BTreeMap<String, f64>);

impl MetricsSnapshot {
  pub fn get(&self, name: &str) -> Option<f64> {
    self.0.get(name).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.0.iter().map(|(k, v)| (k.as_str(), *v))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// `name=value` pairs for log lines.
  pub fn summary(&self) -> String {
    self.0.iter().map(|(k, v)| format!("{k}={v:.4}")).join(" ")
  }
}

impl FromIterator<(String, f64)> for MetricsSnapshot {
  fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
  pub input_dimension: usize,
  pub epochs: usize,
  pub learning_rate: f32,
  /// Fraction of each batch used for training; the rest is held out.
  pub split_ratio: f32,
  pub seed: u64,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      input_dimension: INPUT_DIMENSION,
      epochs: 20,
      learning_rate: 5e-3,
      split_ratio: 0.8,
      seed: 1,
    }
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn parses_nested_arrays() {
    let batch = DataBatch::from_json("[[1, 2.5, 3], [4, 5, 6]]").unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.rows()[0], vec![1.0, 2.5, 3.0]);
    assert!(batch.validate(2).is_ok());
  }

  #[test]
  fn empty_body_is_empty_batch() {
    assert_eq!(DataBatch::from_json("  "), Err(ValidationError::Empty));
    assert_eq!(DataBatch::from_json("[]").unwrap().validate(2), Err(ValidationError::Empty));
  }

  #[test]
  fn rejects_non_numeric_payloads() {
    for body in ["{\"a\": 1}", "[[1, \"x\"]]", "[1, 2]", "[[1, 2]", "null"] {
      assert!(
        matches!(DataBatch::from_json(body), Err(ValidationError::Malformed(_))),
        "{body} should be malformed"
      );
    }
  }

  #[test]
  fn reports_first_ragged_row() {
    let batch = DataBatch::new(vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]]);
    assert_eq!(
      batch.validate(2),
      Err(ValidationError::RowWidth {
        row: 1,
        expected: 3,
        found: 2
      })
    );
  }

  #[test]
  fn reports_non_finite_values() {
    let batch = DataBatch::new(vec![vec![1.0, f32::NAN, 3.0]]);
    assert_eq!(batch.validate(2), Err(ValidationError::NonFinite { row: 0, column: 1 }));
  }

  #[test]
  fn metrics_serialize_as_flat_object() {
    let metrics: MetricsSnapshot = [("loss".to_string(), 0.5), ("accuracy".to_string(), 1.0)]
      .into_iter()
      .collect();
    let json = serde_json::to_string(&metrics).unwrap();
    assert_eq!(json, r#"{"accuracy":1.0,"loss":0.5}"#);
    assert_eq!(metrics.summary(), "accuracy=1.0000 loss=0.5000");
  }

  proptest! {
    #[test]
    fn well_formed_batches_validate(
      dim in 1usize..12,
      rows in 1usize..20,
      value in -1e6f32..1e6f32,
    ) {
      let batch = DataBatch::new(vec![vec![value; dim + 1]; rows]);
      prop_assert!(batch.validate(dim).is_ok());
    }

    #[test]
    fn wrong_width_never_validates(dim in 1usize..12, width in 0usize..24) {
      prop_assume!(width != dim + 1);
      let batch = DataBatch::new(vec![vec![0.0; width]]);
      let is_row_width_error = matches!(batch.validate(dim), Err(ValidationError::RowWidth { .. }));
      prop_assert!(is_row_width_error);
    }

    #[test]
    fn arbitrary_text_never_panics(body in ".*") {
      let _ = DataBatch::from_json(&body);
    }
  }
}
