//! Drives the whole service over HTTP.

use std::{
  collections::BTreeMap,
  net::SocketAddr,
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{extract::State, http::StatusCode, routing::post, Router};
use reqwest::Url;
use retrain::{subcommands::Server, ModelConfig, NotifierConfig, ServiceSettings};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

type Received = Arc<Mutex<Vec<String>>>;

struct Running {
  addr: SocketAddr,
  stop: oneshot::Sender<()>,
  handle: JoinHandle<Result<(), retrain::error::ServerError>>,
}

impl Running {
  fn url(&self, path: &str) -> String {
    format!("http://{}{}", self.addr, path)
  }

  async fn shutdown(self) {
    let _ = self.stop.send(());
    self.handle.await.unwrap().unwrap();
  }
}

async fn hook(status: StatusCode) -> (Url, Received) {
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
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  (Url::parse(&format!("http://{addr}/hook")).unwrap(), received)
}

fn unreachable() -> Url {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  Url::parse(&format!("http://{addr}/hook")).unwrap()
}

async fn start(notify_url: Url) -> Running {
  let mut settings = ServiceSettings::new(notify_url);
  settings.notifier = NotifierConfig::new(settings.notifier.url.clone()).without_proxy();
  settings.model = ModelConfig {
    input_dimension: 2,
    ..ModelConfig::default()
  };
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let (stop, stopped) = oneshot::channel::<()>();
  let handle = tokio::spawn(Server::new(settings).serve(listener, async move {
    let _ = stopped.await;
  }));
  Running { addr, stop, handle }
}

fn client() -> reqwest::Client {
  reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn eventually<F, Fut, T>(mut probe: F) -> T
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = Option<T>>,
{
  for _ in 0..500 {
    if let Some(value) = probe().await {
      return value;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  panic!("condition not reached within 10s");
}

async fn current_metrics(client: &reqwest::Client, server: &Running) -> Option<BTreeMap<String, f64>> {
  let response = client.get(server.url("/metrics")).send().await.unwrap();
  if response.status() != StatusCode::OK {
    return None;
  }
  Some(response.json().await.unwrap())
}

const BATCH: &str = "[[1, 2, 3], [2, 3, 5], [3, 5, 8], [4, 1, 5]]";

#[tokio::test]
async fn empty_body_is_rejected_and_model_untouched() {
  let (url, received) = hook(StatusCode::OK).await;
  let server = start(url).await;
  let client = client();

  let response = client.post(server.url("/notify")).send().await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);

  let response = client.get(server.url("/metrics")).send().await.unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
  assert!(received.lock().unwrap().is_empty());

  server.shutdown().await;
}

#[tokio::test]
async fn valid_batch_is_trained_and_notified() {
  let (url, received) = hook(StatusCode::OK).await;
  let server = start(url).await;
  let client = client();

  let response = client.post(server.url("/notify")).body(BATCH).send().await.unwrap();
  assert_eq!(response.status(), StatusCode::ACCEPTED);
  let accepted: serde_json::Value = response.json().await.unwrap();
  assert_eq!(accepted["job"], 1);

  let delivered = eventually(|| {
    let received = received.clone();
    async move { received.lock().unwrap().first().cloned() }
  })
  .await;
  let delivered: BTreeMap<String, f64> = serde_json::from_str(&delivered).unwrap();
  assert_eq!(delivered.get("samples"), Some(&4.0));

  let queried = current_metrics(&client, &server).await.unwrap();
  assert_eq!(queried, delivered);

  server.shutdown().await;
}

#[tokio::test]
async fn unreachable_notifier_keeps_new_metrics() {
  let server = start(unreachable()).await;
  let client = client();

  let response = client.post(server.url("/notify")).body(BATCH).send().await.unwrap();
  assert_eq!(response.status(), StatusCode::ACCEPTED);

  let metrics = eventually(|| current_metrics(&client, &server)).await;
  assert_eq!(metrics.get("samples"), Some(&4.0));

  server.shutdown().await;
}

#[tokio::test]
async fn health_answers_ok() {
  let server = start(unreachable()).await;
  let response = client().get(server.url("/health")).send().await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(response.text().await.unwrap(), "ok");
  server.shutdown().await;
}
