//! Shared utilities for lifecycle integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ignition::config::{AppConfig, ConfigStore};
use ignition::lifecycle::{Bootstrap, Context, LifecycleState, Orchestrator, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Ordered record of what ran, shared between handlers.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[allow(dead_code)]
pub fn journal() -> Journal {
    Arc::default()
}

#[allow(dead_code)]
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Config bound to loopback on `port` (0 for an ephemeral port).
#[allow(dead_code)]
pub fn test_config(port: u16) -> AppConfig {
    let mut config = AppConfig::default();
    config.app.name = "lifecycle-test".into();
    config.server.host = "127.0.0.1".into();
    config.server.port = port;
    config.server.shutdown_timeout_secs = 2;
    config
}

/// Bootstrap on an ephemeral port, without OS signal handling.
#[allow(dead_code)]
pub fn bootstrap() -> Bootstrap {
    Bootstrap::new(ConfigStore::new(test_config(0))).handle_signals(false)
}

/// A port that nothing is listening on right now.
#[allow(dead_code)]
pub fn unused_port() -> u16 {
    let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

pub struct Running {
    pub ctx: Context,
    pub state: watch::Receiver<LifecycleState>,
    pub task: JoinHandle<Result<()>>,
}

impl Running {
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.ctx.local_addr().expect("server is bound")
    }

    /// Wait for `run()` to return.
    pub async fn finish(self) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("run() did not return in time")
            .expect("run() panicked")
    }
}

/// Spawn `run()` on its own task.
pub fn spawn(app: Bootstrap) -> Running {
    let ctx = app.context().clone();
    let orchestrator: Orchestrator = app.into_orchestrator();
    let state = orchestrator.state();
    let task = tokio::spawn(orchestrator.run());
    Running { ctx, state, task }
}

/// Spawn `run()` and wait until it is serving.
#[allow(dead_code)]
pub async fn start(app: Bootstrap) -> Running {
    let mut running = spawn(app);
    wait_for(&mut running.state, LifecycleState::Running).await;
    running
}

/// Wait until the orchestrator reaches `target`.
pub async fn wait_for(state: &mut watch::Receiver<LifecycleState>, target: LifecycleState) {
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("never reached {target}"))
        .unwrap_or_else(|_| panic!("orchestrator dropped before {target}"));
}

/// Non-pooled client, so connections do not outlive a request.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
