use std::future::Future;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
  coordinator::Coordinator,
  error::ServerError,
  ingress::{self, IngressState},
  model::Model,
  notifier::Notifier,
  settings::ServiceSettings,
};

pub struct Server {
  settings: ServiceSettings,
}

impl Server {
  pub fn new(settings: ServiceSettings) -> Self {
    Self { settings }
  }

  /// Listens on all interfaces until Ctrl-C.
  pub async fn run(self) -> Result<(), ServerError> {
    let addr = format!("0.0.0.0:{}", self.settings.port);
    let listener = TcpListener::bind(&addr)
      .await
      .map_err(|source| ServerError::Bind { addr, source })?;
    self.serve(listener, shutdown_signal()).await
  }

  /// Serves webhooks on `listener` until `shutdown` resolves, then lets the
  /// retrain worker drain what was already accepted.
  pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let settings = self.settings;
    let model = Model::new(settings.model.clone()).shared();
    let notifier = Notifier::new(settings.notifier)?;
    let (queue, worker) = Coordinator::new(model.clone(), notifier, settings.retrain).spawn();

    let state = IngressState {
      queue,
      model,
      input_dimension: settings.model.input_dimension,
    };
    let app = ingress::router(state, settings.max_body_bytes);

    info!(addr = %listener.local_addr()?, "listening for retrain webhooks");
    axum::serve(listener, app)
      .with_graceful_shutdown(shutdown)
      .await?;

    info!("listener stopped, draining retrain queue");
    if let Err(e) = worker.await {
      error!(error = %e, "retrain worker ended abnormally");
    }
    Ok(())
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(error = %e, "cannot listen for ctrl-c, running until killed");
    std::future::pending::<()>().await;
  }
  info!("shutdown requested");
}
