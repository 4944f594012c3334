//! Problemset Backend
//!
//! - Axum HTTP API over the Codeforces `problemset.problems` method
//! - Tag queries in "any" and "only" (exact tag count) modes, sorted by rating
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! Important env variables:
//!   PORT                    : u16 (default 49160)
//!   UPSTREAM_BASE_URL       : default "https://codeforces.com/api/"
//!   PROBLEMSET_CONFIG_PATH  : path to TOML config (server, upstream, tags)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use problemset_backend::{
  build_router, server::shutdown_signal, telemetry, AppConfig, AppState, Server, StopOutcome,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::from_env()?;
  info!(
    target: "problemset_backend",
    port = cfg.server.port,
    read_timeout_secs = cfg.server.read_timeout_secs,
    read_header_timeout_secs = cfg.server.read_header_timeout_secs,
    request_timeout_secs = cfg.server.request_timeout_secs,
    idle_timeout_secs = cfg.server.idle_timeout_secs,
    shutdown_grace_secs = cfg.server.shutdown_grace_secs,
    upstream = %cfg.upstream.base_url,
    "Configuration loaded"
  );

  // Shared read-only state (upstream client + tag catalog).
  let state = Arc::new(AppState::new(&cfg)?);
  let app = build_router(state, &cfg.server);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
  let server = Server::bind(addr, app, &cfg.server).await?;

  shutdown_signal().await;
  if server.stop(cfg.server.shutdown_grace()).await == StopOutcome::Abandoned {
    warn!(target: "problemset_backend", "Exiting with requests still in flight");
  }
  Ok(())
}
