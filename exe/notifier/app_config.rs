use std::{path::Path, time::Duration};

use reqwest::Url;
use retrain::{settings::DEFAULT_PORT, ServiceSettings};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("cannot read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("cannot parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_yaml::Error,
  },
  #[error("no notification url configured (set notify_url or pass --notify-url)")]
  MissingNotifyUrl,
  #[error("invalid notification url {url:?}: {reason}")]
  InvalidNotifyUrl { url: String, reason: String },
  #[error("{0} must be greater than zero")]
  Zero(&'static str),
  #[error("learning_rate must be a positive finite number, got {0}")]
  LearningRate(f32),
}

/// Service configuration as read from a YAML file or the command line.
/// Every field is optional; what is missing falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Where metrics are POSTed after each retrain
  pub notify_url: Option<String>,
  /// Port to listen on for webhooks
  pub port: Option<u16>,
  /// Budget for a single retrain, in seconds
  pub retrain_timeout_secs: Option<u64>,
  /// Budget for a single notification, in seconds
  pub notify_timeout_secs: Option<u64>,
  /// Accepted batches waiting for the retrain worker
  pub queue_capacity: Option<usize>,
  pub max_body_bytes: Option<usize>,
  pub input_dimension: Option<usize>,
  pub epochs: Option<usize>,
  pub learning_rate: Option<f32>,
  pub seed: Option<u64>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.display().to_string(),
      source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.display().to_string(),
      source,
    })
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      notify_url: other.notify_url.or(self.notify_url),
      port: other.port.or(self.port),
      retrain_timeout_secs: other.retrain_timeout_secs.or(self.retrain_timeout_secs),
      notify_timeout_secs: other.notify_timeout_secs.or(self.notify_timeout_secs),
      queue_capacity: other.queue_capacity.or(self.queue_capacity),
      max_body_bytes: other.max_body_bytes.or(self.max_body_bytes),
      input_dimension: other.input_dimension.or(self.input_dimension),
      epochs: other.epochs.or(self.epochs),
      learning_rate: other.learning_rate.or(self.learning_rate),
      seed: other.seed.or(self.seed),
    }
  }

  pub fn into_settings(self) -> Result<ServiceSettings, ConfigError> {
    let raw_url = self.notify_url.ok_or(ConfigError::MissingNotifyUrl)?;
    let url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidNotifyUrl {
      reason: e.to_string(),
      url: raw_url.clone(),
    })?;

    let mut settings = ServiceSettings::new(url);
    settings.port = self.port.unwrap_or(DEFAULT_PORT);
    if let Some(secs) = self.retrain_timeout_secs {
      settings.retrain.timeout = Duration::from_secs(non_zero("retrain_timeout_secs", secs)?);
    }
    if let Some(secs) = self.notify_timeout_secs {
      settings.notifier.timeout = Duration::from_secs(non_zero("notify_timeout_secs", secs)?);
    }
    if let Some(capacity) = self.queue_capacity {
      settings.retrain.queue_capacity = non_zero("queue_capacity", capacity)?;
    }
    if let Some(bytes) = self.max_body_bytes {
      settings.max_body_bytes = non_zero("max_body_bytes", bytes)?;
    }
    if let Some(dimension) = self.input_dimension {
      settings.model.input_dimension = non_zero("input_dimension", dimension)?;
    }
    if let Some(epochs) = self.epochs {
      settings.model.epochs = non_zero("epochs", epochs)?;
    }
    if let Some(lr) = self.learning_rate {
      if !(lr.is_finite() && lr > 0.0) {
        return Err(ConfigError::LearningRate(lr));
      }
      settings.model.learning_rate = lr;
    }
    if let Some(seed) = self.seed {
      settings.model.seed = seed;
    }
    Ok(settings)
  }
}

fn non_zero<T: PartialEq + Default>(name: &'static str, value: T) -> Result<T, ConfigError> {
  if value == T::default() {
    Err(ConfigError::Zero(name))
  } else {
    Ok(value)
  }
}
