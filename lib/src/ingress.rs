//! HTTP surface: `POST /notify` accepts batches, `GET /metrics` reads the model.
//!
//! Only parse, validation and queueing errors reach the HTTP caller. The
//! retrain itself runs after `202 Accepted` has been sent, so its failures
//! are logged by the coordinator and never answered over HTTP.

use axum::{
  extract::{DefaultBodyLimit, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
  coordinator::{JobId, RetrainQueue},
  error::{MetricsError, QueueError, ValidationError},
  model::{DataBatch, MetricsSnapshot, SharedModel},
};

pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct IngressState {
  pub queue: RetrainQueue,
  pub model: SharedModel,
  pub input_dimension: usize,
}

#[derive(Debug, Serialize)]
pub struct Accepted {
  pub job: JobId,
}

#[derive(Debug)]
pub enum IngressError {
  Validation(ValidationError),
  Queue(QueueError),
  Metrics(MetricsError),
}

impl IntoResponse for IngressError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      IngressError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
      IngressError::Queue(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
      IngressError::Metrics(e) => (StatusCode::NOT_FOUND, e.to_string()),
    };
    (status, message).into_response()
  }
}

pub fn router(state: IngressState, max_body_bytes: usize) -> Router {
  Router::new()
    .route("/notify", post(notify))
    .route("/metrics", get(metrics))
    .route("/health", get(health))
    .layer(DefaultBodyLimit::max(max_body_bytes))
    .with_state(state)
}

async fn notify(
  State(state): State<IngressState>,
  body: String,
) -> Result<(StatusCode, Json<Accepted>), IngressError> {
  let batch = DataBatch::from_json(&body)
    .and_then(|batch| batch.validate(state.input_dimension).map(|()| batch))
    .map_err(|e| {
      warn!(error = %e, body_bytes = body.len(), "webhook payload rejected");
      IngressError::Validation(e)
    })?;

  let batch_size = batch.len();
  let job = state.queue.submit(batch).map_err(|e| {
    warn!(error = %e, batch_size, "retrain queue refused batch");
    IngressError::Queue(e)
  })?;
  debug!(job, batch_size, "batch accepted");
  Ok((StatusCode::ACCEPTED, Json(Accepted { job })))
}

async fn metrics(State(state): State<IngressState>) -> Result<Json<MetricsSnapshot>, IngressError> {
  let model = state.model.read().await;
  model.metrics().map(Json).map_err(IngressError::Metrics)
}

async fn health() -> &'static str {
  "ok"
}
