use reqwest::Url;

use crate::{
  coordinator::RetrainSettings,
  ingress::DEFAULT_MAX_BODY_BYTES,
  model::ModelConfig,
  notifier::NotifierConfig,
};

pub const DEFAULT_PORT: u16 = 8080;

/// Everything the webhook service needs, fully resolved.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
  pub port: u16,
  pub max_body_bytes: usize,
  pub model: ModelConfig,
  pub notifier: NotifierConfig,
  pub retrain: RetrainSettings,
}

impl ServiceSettings {
  /// Defaults for everything except the notification endpoint.
  pub fn new(notify_url: Url) -> Self {
    Self {
      port: DEFAULT_PORT,
      max_body_bytes: DEFAULT_MAX_BODY_BYTES,
      model: ModelConfig::default(),
      notifier: NotifierConfig::new(notify_url),
      retrain: RetrainSettings::default(),
    }
  }
}
