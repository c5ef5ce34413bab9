//! Error kinds of every component.
//!
//! Ingress-level errors ([`ValidationError`], [`QueueError`]) are answered to
//! the HTTP caller. Everything the coordinator runs into happens after the
//! response is sent and only ends up in logs and [`crate::RetrainReport`]s.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("malformed batch: {0}")]
  Malformed(String),
  #[error("batch is empty")]
  Empty,
  #[error("row {row} has {found} values, expected {expected}")]
  RowWidth {
    row: usize,
    expected: usize,
    found: usize,
  },
  #[error("row {row} column {column} is not a finite number")]
  NonFinite { row: usize, column: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("training diverged at epoch {epoch}")]
  Diverged { epoch: usize },
  #[error("training was cancelled")]
  Cancelled,
  #[error("training task panicked: {0}")]
  Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
  #[error("model has not been trained yet")]
  NotTrained,
}

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("cannot build http client: {0}")]
  Client(#[source] reqwest::Error),
  #[error("cannot serialize metrics: {0}")]
  Serialize(#[from] serde_json::Error),
  #[error("cannot reach notification endpoint: {0}")]
  Transport(#[source] reqwest::Error),
  #[error("notification endpoint answered {status}")]
  Status { status: reqwest::StatusCode },
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrainError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Train(#[from] TrainError),
  #[error("retraining exceeded its budget of {0:?}")]
  Timeout(Duration),
}

impl RetrainError {
  pub fn kind(&self) -> &'static str {
    match self {
      RetrainError::Validation(_) => "validation",
      RetrainError::Train(_) => "train",
      RetrainError::Timeout(_) => "timeout",
    }
  }
}

/// Why a successfully trained job ended in `NotifyFailed`.
#[derive(Debug, Error)]
pub enum DeliveryError {
  #[error(transparent)]
  Metrics(#[from] MetricsError),
  #[error(transparent)]
  Notify(#[from] NotifyError),
}

impl DeliveryError {
  pub fn kind(&self) -> &'static str {
    match self {
      DeliveryError::Metrics(_) => "metrics",
      DeliveryError::Notify(_) => "notify",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
  #[error("retrain queue is full")]
  Full,
  #[error("retrain queue is closed")]
  Closed,
}

#[derive(Debug, Error)]
pub enum DatasetError {
  #[error("cannot read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error(transparent)]
  Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ServerError {
  #[error("cannot bind {addr}: {source}")]
  Bind {
    addr: String,
    #[source]
    source: std::io::Error,
  },
  #[error("server io error: {0}")]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Notifier(#[from] NotifyError),
}

#[derive(Debug, Error)]
pub enum CommandError {
  #[error(transparent)]
  Dataset(#[from] DatasetError),
  #[error(transparent)]
  Train(#[from] TrainError),
  #[error(transparent)]
  Metrics(#[from] MetricsError),
  #[error(transparent)]
  Notify(#[from] NotifyError),
}
