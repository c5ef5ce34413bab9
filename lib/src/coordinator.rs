//! Sequences validation, training and notification for each accepted batch.
//!
//! A single worker task owns the receiving end of the retrain queue, so at
//! most one retrain is in flight and the model has exactly one writer. Jobs
//! are processed in acceptance order; the last accepted batch wins.
//!
//! Per job: `Received -> Training -> (Succeeded | Failed) -> (Notified |
//! NotifyFailed)`. Every job produces exactly one [`RetrainReport`], which is
//! logged and broadcast to subscribers.

use std::{
  fmt,
  sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

use tokio::{
  sync::{broadcast, mpsc},
  task::JoinHandle,
};
use tracing::{error, info, warn};

use crate::{
  error::{DeliveryError, MetricsError, QueueError, RetrainError, TrainError},
  model::{run_model, DataBatch, MetricsSnapshot, SharedModel},
  notifier::Notifier,
};

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrainSettings {
  /// Budget for one training run, counted from the moment it starts.
  pub timeout: Duration,
  pub queue_capacity: usize,
}

impl Default for RetrainSettings {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(10),
      queue_capacity: 64,
    }
  }
}

#[derive(Debug)]
pub struct RetrainJob {
  pub id: JobId,
  pub batch: DataBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Received,
  Training,
  Succeeded,
  Failed,
  Notified,
  NotifyFailed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Received => "received",
      Stage::Training => "training",
      Stage::Succeeded => "succeeded",
      Stage::Failed => "failed",
      Stage::Notified => "notified",
      Stage::NotifyFailed => "notify_failed",
    };
    f.write_str(name)
  }
}

#[derive(Debug)]
pub enum Outcome {
  Failed(RetrainError),
  /// Training succeeded and these metrics were delivered.
  Notified(MetricsSnapshot),
  /// Training succeeded and its state is kept, but delivery failed.
  NotifyFailed(DeliveryError),
}

impl Outcome {
  pub fn trained(&self) -> bool {
    !matches!(self, Outcome::Failed(_))
  }

  /// The terminal stage this outcome corresponds to.
  pub fn stage(&self) -> Stage {
    match self {
      Outcome::Failed(_) => Stage::Failed,
      Outcome::Notified(_) => Stage::Notified,
      Outcome::NotifyFailed(_) => Stage::NotifyFailed,
    }
  }
}

#[derive(Debug)]
pub struct RetrainReport {
  pub job: JobId,
  pub batch_size: usize,
  /// Time from `Received` to the terminal stage.
  pub elapsed: Duration,
  pub outcome: Outcome,
}

/// Cloneable submitting side of the retrain queue.
#[derive(Clone)]
pub struct RetrainQueue {
  tx: mpsc::Sender<RetrainJob>,
  reports: broadcast::Sender<Arc<RetrainReport>>,
  next_id: Arc<AtomicU64>,
}

impl RetrainQueue {
  /// Enqueues without waiting; returns the id the job's report will carry.
  /// Ids are only handed out to accepted jobs, so they have no gaps.
  pub fn submit(&self, batch: DataBatch) -> Result<JobId, QueueError> {
    let permit = self.tx.try_reserve().map_err(|e| match e {
      mpsc::error::TrySendError::Full(()) => QueueError::Full,
      mpsc::error::TrySendError::Closed(()) => QueueError::Closed,
    })?;
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    permit.send(RetrainJob { id, batch });
    Ok(id)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Arc<RetrainReport>> {
    self.reports.subscribe()
  }
}

pub struct Coordinator {
  model: SharedModel,
  notifier: Notifier,
  settings: RetrainSettings,
  reports: broadcast::Sender<Arc<RetrainReport>>,
}

impl Coordinator {
  pub fn new(model: SharedModel, notifier: Notifier, settings: RetrainSettings) -> Self {
    let (reports, _) = broadcast::channel(settings.queue_capacity.max(1));
    Self {
      model,
      notifier,
      settings,
      reports,
    }
  }

  /// Starts the worker. It exits after every [`RetrainQueue`] clone is
  /// dropped and the queued jobs are drained.
  pub fn spawn(self) -> (RetrainQueue, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(self.settings.queue_capacity.max(1));
    let queue = RetrainQueue {
      tx,
      reports: self.reports.clone(),
      next_id: Arc::new(AtomicU64::new(1)),
    };
    let handle = tokio::spawn(self.run(rx));
    (queue, handle)
  }

  async fn run(self, mut inbox: mpsc::Receiver<RetrainJob>) {
    info!(
      timeout_ms = self.settings.timeout.as_millis() as u64,
      endpoint = %self.notifier.endpoint(),
      "retrain worker started"
    );
    while let Some(job) = inbox.recv().await {
      let report = self.process(job).await;
      // no subscribers is fine
      let _ = self.reports.send(Arc::new(report));
    }
    info!("retrain worker stopped");
  }

  pub async fn process(&self, job: RetrainJob) -> RetrainReport {
    let received = Instant::now();
    let batch_size = job.batch.len();
    info!(job = job.id, batch_size, stage = %Stage::Received, "retrain job received");

    let outcome = match self.retrain(job.id, job.batch).await {
      Err(err) => {
        error!(
          job = job.id,
          batch_size,
          elapsed_ms = received.elapsed().as_millis() as u64,
          kind = err.kind(),
          error = %err,
          stage = %Stage::Failed,
          "retrain failed"
        );
        Outcome::Failed(err)
      }
      Ok(metrics) => {
        info!(
          job = job.id,
          batch_size,
          elapsed_ms = received.elapsed().as_millis() as u64,
          stage = %Stage::Succeeded,
          "retrain succeeded"
        );
        self.deliver(job.id, metrics).await
      }
    };

    RetrainReport {
      job: job.id,
      batch_size,
      elapsed: received.elapsed(),
      outcome,
    }
  }

  /// Runs training against the deadline and installs the result if it won.
  async fn retrain(
    &self,
    job: JobId,
    batch: DataBatch,
  ) -> Result<Result<MetricsSnapshot, MetricsError>, RetrainError> {
    let config = self.model.read().await.config().clone();
    batch.validate(config.input_dimension)?;

    info!(job, stage = %Stage::Training, "training started");
    let cancel = Arc::new(AtomicBool::new(false));
    let training = tokio::task::spawn_blocking({
      let cancel = cancel.clone();
      move || run_model(&batch, &config, &cancel)
    });

    let trained = match tokio::time::timeout(self.settings.timeout, training).await {
      Err(_elapsed) => {
        cancel.store(true, Ordering::Relaxed);
        return Err(RetrainError::Timeout(self.settings.timeout));
      }
      Ok(Err(join_error)) => return Err(TrainError::Panicked(join_error.to_string()).into()),
      Ok(Ok(result)) => result?,
    };

    // read back under the same lock so the snapshot belongs to this run
    let mut model = self.model.write().await;
    model.install(trained);
    Ok(model.metrics())
  }

  async fn deliver(&self, job: JobId, metrics: Result<MetricsSnapshot, MetricsError>) -> Outcome {
    let delivery = match metrics {
      Ok(metrics) => match self.notifier.notify(&metrics).await {
        Ok(()) => Ok(metrics),
        Err(e) => Err(DeliveryError::from(e)),
      },
      Err(e) => Err(DeliveryError::from(e)),
    };

    match delivery {
      Ok(metrics) => {
        info!(
          job,
          endpoint = %self.notifier.endpoint(),
          metrics = %metrics.summary(),
          stage = %Stage::Notified,
          "notification delivered"
        );
        Outcome::Notified(metrics)
      }
      Err(err) => {
        warn!(
          job,
          endpoint = %self.notifier.endpoint(),
          kind = err.kind(),
          error = %err,
          stage = %Stage::NotifyFailed,
          "notification failed"
        );
        Outcome::NotifyFailed(err)
      }
    }
  }
}
