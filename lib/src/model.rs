pub mod linear;
pub mod types;
pub mod utils;

use std::sync::{atomic::AtomicBool, Arc};

use tokio::sync::RwLock;

pub use linear::*;
pub use types::*;
pub use utils::*;

use crate::error::{MetricsError, TrainError};

/// The model shared between the retrain worker (sole writer) and readers.
pub type SharedModel = Arc<RwLock<Model>>;

/// A trainable model and the metrics of its last successful training.
///
/// Training never mutates in place: [`Model::fit`] computes a [`TrainedState`]
/// and [`Model::install`] swaps it in whole, so weights and metrics always
/// belong to the same run.
#[derive(Debug)]
pub struct Model {
  config: ModelConfig,
  state: Option<TrainedState>,
  generation: u64,
}

impl Model {
  pub fn new(config: ModelConfig) -> Self {
    Self {
      config,
      state: None,
      generation: 0,
    }
  }

  pub fn shared(self) -> SharedModel {
    Arc::new(RwLock::new(self))
  }

  pub fn config(&self) -> &ModelConfig {
    &self.config
  }

  /// Number of installed trainings.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn state(&self) -> Option<&TrainedState> {
    self.state.as_ref()
  }

  pub fn fit(&self, batch: &DataBatch, cancel: &AtomicBool) -> Result<TrainedState, TrainError> {
    run_model(batch, &self.config, cancel)
  }

  pub fn install(&mut self, trained: TrainedState) {
    self.state = Some(trained);
    self.generation += 1;
  }

  /// Replaces the state with one trained on `batch`; untouched on error.
  pub fn train(&mut self, batch: &DataBatch) -> Result<(), TrainError> {
    let trained = self.fit(batch, &AtomicBool::new(false))?;
    self.install(trained);
    Ok(())
  }

  pub fn metrics(&self) -> Result<MetricsSnapshot, MetricsError> {
    self
      .state
      .as_ref()
      .map(|s| s.metrics().clone())
      .ok_or(MetricsError::NotTrained)
  }

  /// Missing trailing features count as zero, extra ones are ignored.
  pub fn predict(&self, features: &[f32]) -> Result<f32, MetricsError> {
    self
      .state
      .as_ref()
      .map(|s| s.predict(features))
      .ok_or(MetricsError::NotTrained)
  }
}

impl Default for Model {
  fn default() -> Self {
    Self::new(ModelConfig::default())
  }
}
