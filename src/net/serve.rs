//! Background accept loop and two-step drain.
//!
//! ```text
//! serve(listener, router)            → ServerHandle
//!     accept loop on its own task; one task per connection (JoinSet)
//!
//! ServerHandle::drain(deadline)
//!     1. stop accepting, ask each connection to finish and close
//!     2. deadline passed → abort the remaining connection tasks
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::observability::metrics;

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Outcome of a drain that finished within its deadline.
#[derive(Debug, Clone, Copy)]
pub struct DrainReport {
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    /// Connections were still busy at the deadline and were force-closed.
    #[error("drain deadline of {deadline:?} exceeded, {in_flight} connection(s) force-closed")]
    Timeout { deadline: Duration, in_flight: u64 },

    /// The accept loop panicked while draining.
    #[error("serve task failed: {0}")]
    Serve(String),
}

/// Handle to a running server.
///
/// Dropping the handle without draining stops the accept loop and
/// force-closes every connection.
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    force_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    tracker: ConnectionTracker,
}

/// Start serving `router` on `listener` in a background task.
pub fn serve(listener: Listener, router: Router) -> ServerHandle {
    let local_addr = listener.local_addr();
    let tracker = ConnectionTracker::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    let (force_tx, force_rx) = oneshot::channel();

    let task = tokio::spawn(accept_loop(listener, router, tracker.clone(), stop_rx, force_rx));

    ServerHandle {
        local_addr,
        stop_tx,
        force_tx: Some(force_tx),
        task,
        tracker,
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of open connections.
    pub fn in_flight(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting, let open connections finish for up to `deadline`,
    /// then force-close whatever is left.
    pub async fn drain(mut self, deadline: Duration) -> Result<DrainReport, DrainError> {
        let start = Instant::now();
        let _ = self.stop_tx.send(true);
        tracing::info!(
            deadline_ms = deadline.as_millis() as u64,
            in_flight = self.tracker.active_count(),
            "Draining listener"
        );

        let result = match tokio::time::timeout(deadline, &mut self.task).await {
            Ok(Ok(())) => Ok(DrainReport { elapsed: start.elapsed() }),
            Ok(Err(e)) => Err(DrainError::Serve(e.to_string())),
            Err(_) => {
                let in_flight = self.tracker.active_count();
                tracing::warn!(in_flight, "Drain deadline exceeded, force-closing connections");
                if let Some(force) = self.force_tx.take() {
                    let _ = force.send(());
                }
                if (&mut self.task).await.is_err() {
                    tracing::error!("Serve task failed while force-closing");
                }
                Err(DrainError::Timeout { deadline, in_flight })
            }
        };

        metrics::record_drain(matches!(result, Err(DrainError::Timeout { .. })), start.elapsed());
        result
    }
}

async fn accept_loop(
    listener: Listener,
    router: Router,
    tracker: ConnectionTracker,
    mut stop_rx: watch::Receiver<bool>,
    force_rx: oneshot::Receiver<()>,
) {
    let builder = Builder::new(TokioExecutor::new());
    let mut connections = JoinSet::new();

    tracing::info!(address = %listener.local_addr(), "HTTP server accepting connections");

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            accepted = listener.accept() => {
                let (stream, peer, permit) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                let guard = tracker.track();
                let id = guard.id();
                let builder = builder.clone();
                let service = TowerToHyperService::new(router.clone());
                let mut stop = stop_rx.clone();

                connections.spawn(async move {
                    let _permit = permit;
                    let _guard = guard;

                    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                    tokio::pin!(conn);

                    tokio::select! {
                        res = conn.as_mut() => {
                            if let Err(e) = res {
                                tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection error");
                            }
                            return;
                        }
                        _ = stop.changed() => {}
                    }

                    // Finish the in-flight request, then close.
                    conn.as_mut().graceful_shutdown();
                    if let Err(e) = conn.as_mut().await {
                        tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection error during drain");
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    tracing::info!(open_connections = tracker.active_count(), "Stopped accepting connections");

    let forced = tokio::select! {
        _ = async { while connections.join_next().await.is_some() {} } => false,
        _ = force_rx => true,
    };

    if forced {
        connections.shutdown().await;
        tracing::warn!("Remaining connections aborted");
    } else {
        tracing::info!("All connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use axum::routing::get;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

    async fn start(router: Router) -> ServerHandle {
        let listener = Listener::bind("127.0.0.1:0", 16).await.unwrap();
        serve(listener, router)
    }

    fn recorder() -> &'static PrometheusHandle {
        static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
        HANDLE.get_or_init(|| PrometheusBuilder::new().install_recorder().unwrap())
    }

    #[tokio::test]
    async fn every_drain_is_recorded() {
        let metrics = recorder();
        let handle = start(Router::new()).await;

        handle.drain(Duration::from_secs(1)).await.unwrap();
        assert!(metrics
            .render()
            .contains("server_drain_total{outcome=\"clean\"}"));
    }

    #[tokio::test]
    async fn idle_server_drains_immediately() {
        let handle = start(Router::new().route("/", get(|| async { "ok" }))).await;
        let addr = handle.local_addr();

        let body = reqwest::get(format!("http://{addr}/")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");

        let report = handle.drain(Duration::from_secs(5)).await.unwrap();
        assert!(report.elapsed < Duration::from_secs(5));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn in_flight_request_finishes_before_deadline() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "done"
            }),
        );
        let handle = start(router).await;
        let url = format!("http://{}/slow", handle.local_addr());

        let request = tokio::spawn(async move { reqwest::get(url).await?.text().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.in_flight(), 1);

        handle.drain(Duration::from_secs(2)).await.unwrap();
        assert_eq!(request.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn stuck_request_is_force_closed_at_deadline() {
        let router = Router::new().route(
            "/stuck",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "never"
            }),
        );
        let handle = start(router).await;
        let url = format!("http://{}/stuck", handle.local_addr());

        let request = tokio::spawn(async move { reqwest::get(url).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let err = handle.drain(Duration::from_millis(200)).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            DrainError::Timeout { in_flight, .. } => assert_eq!(in_flight, 1),
            other => panic!("unexpected error: {other}"),
        }

        // The client sees the connection drop instead of a response.
        let outcome = tokio::time::timeout(Duration::from_secs(5), request).await.unwrap().unwrap();
        assert!(outcome.is_err());
    }
}
