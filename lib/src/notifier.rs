use std::time::Duration;

use reqwest::{header, Url};
use tracing::debug;

use crate::{error::NotifyError, model::MetricsSnapshot};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
  pub url: Url,
  /// Whole-request timeout for one delivery.
  pub timeout: Duration,
  /// Honour `HTTP_PROXY` and friends from the environment.
  pub system_proxy: bool,
}

impl NotifierConfig {
  pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

  pub fn new(url: Url) -> Self {
    Self {
      url,
      timeout: Self::DEFAULT_TIMEOUT,
      system_proxy: true,
    }
  }

  pub fn without_proxy(mut self) -> Self {
    self.system_proxy = false;
    self
  }
}

/// Posts metrics snapshots to a single configured endpoint.
#[derive(Debug, Clone)]
pub struct Notifier {
  client: reqwest::Client,
  url: Url,
}

impl Notifier {
  pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout);
    if !config.system_proxy {
      builder = builder.no_proxy();
    }
    let client = builder.build().map_err(NotifyError::Client)?;
    Ok(Self {
      client,
      url: config.url,
    })
  }

  pub fn endpoint(&self) -> &Url {
    &self.url
  }

  /// Delivers `metrics` as a JSON object. Any non-2xx answer is an error.
  pub async fn notify(&self, metrics: &MetricsSnapshot) -> Result<(), NotifyError> {
    let body = serde_json::to_vec(metrics)?;
    let response = self
      .client
      .post(self.url.clone())
      .header(header::CONTENT_TYPE, "application/json")
      .body(body)
      .send()
      .await
      .map_err(NotifyError::Transport)?;

    let status = response.status();
    if !status.is_success() {
      return Err(NotifyError::Status { status });
    }
    debug!(url = %self.url, %status, "metrics delivered");
    Ok(())
  }
}
