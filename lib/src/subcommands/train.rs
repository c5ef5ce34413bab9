use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
  error::CommandError,
  model::{read_dataset, MetricsSnapshot, Model, ModelConfig},
  notifier::{Notifier, NotifierConfig},
};

/// One-off training on a dataset file, optionally notifying the result.
pub struct Train {
  data: PathBuf,
  config: ModelConfig,
  notifier: Option<NotifierConfig>,
}

impl Train {
  pub fn new(data: &Path, config: ModelConfig, notifier: Option<NotifierConfig>) -> Self {
    Self {
      data: PathBuf::from(data),
      config,
      notifier,
    }
  }

  pub async fn run(self) -> Result<MetricsSnapshot, CommandError> {
    let batch = read_dataset(&self.data)?;
    let mut model = Model::new(self.config);
    model.train(&batch)?;
    let metrics = model.metrics()?;
    info!(
      data = %self.data.display(),
      batch_size = batch.len(),
      metrics = %metrics.summary(),
      "model trained"
    );

    if let Some(config) = self.notifier {
      let notifier = Notifier::new(config)?;
      notifier.notify(&metrics).await?;
      info!(endpoint = %notifier.endpoint(), "metrics delivered");
    }
    Ok(metrics)
  }
}
