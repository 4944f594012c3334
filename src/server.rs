//! HTTP server lifecycle.
//!
//! `Server::start` runs an accept loop on an already-bound listener and hands
//! back a handle. Each connection is served by hyper with a header-read timer
//! and an idle bound taken from `ServerConfig`. Whoever owns the handle decides
//! when to stop: the binary maps SIGINT/SIGTERM onto `stop(grace)`, tests call
//! it directly.
//!
//! ```text
//! start ──▶ serving ──stop(grace)──▶ draining ──▶ Drained
//!                                        └─ grace elapsed ─▶ Abandoned
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::service::{service_fn, Service as _};
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// How `stop` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Every in-flight request finished inside the grace period.
    Drained,
    /// The grace period elapsed; remaining requests are no longer awaited.
    Abandoned,
}

/// Handle to a running server.
pub struct Server {
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Server {
    /// Bind `addr` and start serving `router`.
    pub async fn bind(addr: SocketAddr, router: Router, config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Self::start(listener, router, config)
    }

    /// Start serving `router` on an already-bound listener.
    pub fn start(listener: TcpListener, router: Router, config: &ServerConfig) -> Result<Self, ServerError> {
        let local_addr = listener.local_addr()?;
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut builder = Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(config.read_header_timeout());

        let handle = tokio::spawn(accept_loop(listener, router, builder, config.idle_timeout(), stop_rx));

        info!(
            target: "problemset_backend",
            address = %local_addr,
            read_header_timeout = ?config.read_header_timeout(),
            idle_timeout = ?config.idle_timeout(),
            "HTTP server listening"
        );
        Ok(Self { local_addr, stop_tx, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait up to `grace` for in-flight requests.
    pub async fn stop(self, grace: Duration) -> StopOutcome {
        let Server { local_addr, stop_tx, mut handle } = self;
        info!(target: "problemset_backend", address = %local_addr, grace = ?grace, "Shutting down server");
        let _ = stop_tx.send(true);

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => {
                info!(target: "problemset_backend", "Server shut down gracefully");
                StopOutcome::Drained
            }
            Ok(Err(e)) => {
                error!(target: "problemset_backend", error = %e, "Server task failed");
                StopOutcome::Drained
            }
            Err(_) => {
                warn!(target: "problemset_backend", grace = ?grace, "Graceful shutdown timed out; abandoning in-flight requests");
                // Aborting drops the connection set, which aborts every connection task.
                handle.abort();
                StopOutcome::Abandoned
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Router,
    builder: Builder<TokioExecutor>,
    idle_timeout: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut conns = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!(target: "problemset_backend", %peer, "Connection accepted");
                    conns.spawn(serve_connection(
                        stream,
                        peer,
                        router.clone(),
                        builder.clone(),
                        idle_timeout,
                        stop_rx.clone(),
                    ));
                }
                Err(e) => {
                    warn!(target: "problemset_backend", error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
            // A dropped handle also counts as a stop request.
            _ = stop_rx.changed() => break,
            Some(_) = conns.join_next(), if !conns.is_empty() => {}
        }
    }

    drop(listener);
    debug!(target: "problemset_backend", connections = conns.len(), "Listener closed; draining connections");
    while conns.join_next().await.is_some() {}
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    builder: Builder<TokioExecutor>,
    idle_timeout: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let activity = ConnectionActivity::new();
    let tracker = activity.clone();
    let svc = TowerToHyperService::new(router);
    let service = service_fn(move |req: Request<Incoming>| {
        let guard = tracker.begin();
        let fut = svc.call(req);
        async move {
            let res = fut.await;
            drop(guard);
            res
        }
    });

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let mut idle_check = tokio::time::interval(idle_check_period(idle_timeout));
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut closing = false;

    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    debug!(target: "problemset_backend", %peer, error = %e, "Connection ended with error");
                }
                break;
            }
            _ = stop_rx.changed(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
            _ = idle_check.tick(), if !closing => {
                if activity.idle_for() >= idle_timeout {
                    debug!(target: "problemset_backend", %peer, idle_timeout = ?idle_timeout, "Closing idle connection");
                    closing = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }
    trace!(target: "problemset_backend", %peer, "Connection closed");
}

fn idle_check_period(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(1))
}

/// Request accounting for one connection: how many requests are in flight
/// and when the last one started or finished.
#[derive(Debug, Clone)]
struct ConnectionActivity {
    opened: Instant,
    in_flight: Arc<AtomicUsize>,
    last_active_ms: Arc<AtomicU64>,
}

impl ConnectionActivity {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            last_active_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a request start. Returns a guard that records its end on drop.
    fn begin(&self) -> RequestGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        RequestGuard { activity: self.clone() }
    }

    fn touch(&self) {
        let ms = u64::try_from(self.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_active_ms.store(ms, Ordering::SeqCst);
    }

    /// Zero while a request is in flight.
    fn idle_for(&self) -> Duration {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Duration::ZERO;
        }
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::SeqCst));
        self.opened.elapsed().saturating_sub(last)
    }
}

struct RequestGuard {
    activity: ConnectionActivity,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolve on SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(target: "problemset_backend", error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(target: "problemset_backend", error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target: "problemset_backend", "Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_in_flight_is_never_idle() {
        let activity = ConnectionActivity::new();
        let guard = activity.begin();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(activity.idle_for(), Duration::ZERO);

        drop(guard);
        assert!(activity.idle_for() < Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(20));
        assert!(activity.idle_for() >= Duration::from_millis(20));
    }

    #[test]
    fn idle_check_period_is_bounded() {
        assert_eq!(idle_check_period(Duration::from_secs(60)), Duration::from_secs(1));
        assert_eq!(idle_check_period(Duration::from_secs(1)), Duration::from_millis(250));
        assert_eq!(idle_check_period(Duration::from_millis(8)), Duration::from_millis(10));
    }
}
