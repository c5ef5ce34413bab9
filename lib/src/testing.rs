//! Local notification endpoints and log capture for tests.

use std::{
  io,
  sync::{Arc, Mutex},
};

use axum::{extract::State, http::StatusCode, routing::post, Router};
use reqwest::Url;
use tracing::subscriber::DefaultGuard;

pub type Received = Arc<Mutex<Vec<String>>>;

/// Serves `POST /hook` on an ephemeral port, recording bodies and answering `status`.
pub async fn hook_endpoint(status: StatusCode) -> (Url, Received) {
  let received: Received = Arc::default();
  let app = Router::new()
    .route(
      "/hook",
      post(move |State(received): State<Received>, body: String| async move {
        received.lock().unwrap().push(body);
        status
      }),
    )
    .with_state(received.clone());
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  (Url::parse(&format!("http://{addr}/hook")).unwrap(), received)
}

/// A URL nothing listens on.
pub fn unreachable_url() -> Url {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  Url::parse(&format!("http://{addr}/hook")).unwrap()
}

/// Formatted log output of the current thread, collected while the guard lives.
#[derive(Clone, Default)]
pub struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
  pub fn capture() -> (Self, DefaultGuard) {
    let logs = Logs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
      .with_ansi(false)
      .without_time()
      .with_writer(move || writer.clone())
      .finish();
    (logs, tracing::subscriber::set_default(subscriber))
  }

  pub fn lines(&self) -> Vec<String> {
    let buf = self.0.lock().unwrap();
    String::from_utf8_lossy(&buf).lines().map(str::to_owned).collect()
  }

  /// Number of lines containing `text`.
  pub fn count(&self, text: &str) -> usize {
    self.lines().iter().filter(|line| line.contains(text)).count()
  }
}

impl io::Write for Logs {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}
