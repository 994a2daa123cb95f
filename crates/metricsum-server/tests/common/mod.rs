#![allow(dead_code)]

use std::sync::Arc;

use metricsum_core::MetricStore;
use metricsum_server::{app_state::AppState, config, config::AppConfig, lifecycle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A real server on an ephemeral loopback port.
pub struct TestServer {
    pub base: String,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Trigger graceful shutdown and wait for `serve` to return.
    pub async fn stop(mut self) -> std::io::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.expect("serve task panicked")
    }
}

pub fn test_config(ttl_ms: u64) -> AppConfig {
    config::load_from_str(&format!(
        r#"
version: 1
server:
  listen: "127.0.0.1:0"
  shutdown_grace_ms: 1000
store:
  ttl_ms: {ttl_ms}
"#
    ))
    .expect("test config must parse")
}

pub async fn start(cfg: AppConfig) -> TestServer {
    let state = AppState::new(cfg).expect("state must build");
    start_with_state(state).await
}

pub async fn start_with_store(store: Arc<dyn MetricStore>) -> TestServer {
    start_with_state(AppState::with_store(test_config(3_600_000), store)).await
}

async fn start_with_state(state: AppState) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind must succeed");
    let addr = listener.local_addr().expect("local addr");

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(lifecycle::serve(listener, state.clone(), async move {
        let _ = rx.await;
    }));

    TestServer {
        base: format!("http://{addr}"),
        state,
        shutdown: Some(tx),
        handle,
    }
}
