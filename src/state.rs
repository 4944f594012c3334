//! Application state shared by all handlers.
//!
//! Everything here is built once at startup and only read afterwards:
//!   - the upstream problemset client (reqwest pools connections internally)
//!   - the deduplicated tag catalog
//!
//! There is no per-request or cross-request mutable state, so no locks.

use tracing::{info, instrument};

use crate::config::{AppConfig, TagCatalog};
use crate::upstream::{ProblemsetClient, UpstreamError};

#[derive(Clone)]
pub struct AppState {
    pub upstream: ProblemsetClient,
    pub catalog: TagCatalog,
}

impl AppState {
    /// Build state from a validated config.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: &AppConfig) -> Result<Self, UpstreamError> {
        let upstream = ProblemsetClient::new(&cfg.upstream)?;
        info!(target: "problemset_backend", endpoint = %upstream.endpoint(), tags = cfg.tags.len(), "Upstream client ready");
        Ok(Self::from_parts(upstream, cfg.tags.clone()))
    }

    pub fn from_parts(upstream: ProblemsetClient, catalog: TagCatalog) -> Self {
        Self { upstream, catalog }
    }
}
