//! Loading service configuration (server, upstream, tag catalog) from TOML.
//!
//! The file is optional: without `PROBLEMSET_CONFIG_PATH` every value takes its
//! default. `PORT` and `UPSTREAM_BASE_URL` override the file afterwards.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

pub const CONFIG_PATH_ENV: &str = "PROBLEMSET_CONFIG_PATH";

/// Tags the upstream provider is known to accept.
const DEFAULT_TAGS: &[&str] = &[
  "dp", "greedy", "math", "geometry", "strings",
  "data structures", "trees", "graphs", "sortings", "binary search",
  "hashing", "bitmasks",
];

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse config file: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid config: {0}")]
  Invalid(String),
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub upstream: UpstreamConfig,
  #[serde(default)]
  pub tags: TagCatalog,
}

/// Listener and transport settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub port: u16,
  /// Max wait for the next chunk of a request body.
  pub read_timeout_secs: u64,
  /// Max time for a client to finish sending request headers.
  pub read_header_timeout_secs: u64,
  /// Upper bound on handling one request, upstream call included.
  pub request_timeout_secs: u64,
  /// Keep-alive connections with no request in flight are closed after this.
  pub idle_timeout_secs: u64,
  /// How long `stop` waits for in-flight requests.
  pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: 49160,
      read_timeout_secs: 5,
      read_header_timeout_secs: 2,
      request_timeout_secs: 10,
      idle_timeout_secs: 60,
      shutdown_grace_secs: 10,
    }
  }
}

impl ServerConfig {
  pub fn read_timeout(&self) -> Duration {
    Duration::from_secs(self.read_timeout_secs)
  }

  pub fn read_header_timeout(&self) -> Duration {
    Duration::from_secs(self.read_header_timeout_secs)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn idle_timeout(&self) -> Duration {
    Duration::from_secs(self.idle_timeout_secs)
  }

  pub fn shutdown_grace(&self) -> Duration {
    Duration::from_secs(self.shutdown_grace_secs)
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  /// API root, with trailing slash; the method name is appended verbatim.
  pub base_url: String,
  pub method: String,
  pub user_agent: String,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: "https://codeforces.com/api/".into(),
      method: "problemset.problems".into(),
      user_agent: "problemset-backend/0.1".into(),
    }
  }
}

/// Known provider tags, deduplicated once at startup and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct TagCatalog {
  tags: Vec<String>,
}

impl TagCatalog {
  /// Keeps the first occurrence of each tag, in input order.
  pub fn new<I, S>(tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
      let tag = tag.into();
      if !out.contains(&tag) {
        out.push(tag);
      }
    }
    Self { tags: out }
  }

  pub fn as_slice(&self) -> &[String] {
    &self.tags
  }

  pub fn len(&self) -> usize {
    self.tags.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tags.is_empty()
  }
}

impl Default for TagCatalog {
  fn default() -> Self {
    Self::new(DEFAULT_TAGS.iter().copied())
  }
}

impl From<Vec<String>> for TagCatalog {
  fn from(tags: Vec<String>) -> Self {
    Self::new(tags)
  }
}

impl AppConfig {
  /// Build the runtime config: optional file, then env overrides, then validation.
  /// An unreadable or unparsable file is logged and replaced by defaults;
  /// an invalid final config is an error.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut cfg = load_config_from_env().unwrap_or_default();
    cfg.apply_overrides(|key| std::env::var(key).ok());
    cfg.validate()?;
    Ok(cfg)
  }

  /// Apply `PORT` / `UPSTREAM_BASE_URL` from the given lookup.
  pub fn apply_overrides<F>(&mut self, lookup: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(url) = lookup("UPSTREAM_BASE_URL") {
      self.upstream.base_url = url;
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.server.port == 0 {
      return Err(ConfigError::Invalid("server.port must be non-zero".into()));
    }
    let timeouts = [
      ("read_timeout_secs", self.server.read_timeout_secs),
      ("read_header_timeout_secs", self.server.read_header_timeout_secs),
      ("request_timeout_secs", self.server.request_timeout_secs),
      ("idle_timeout_secs", self.server.idle_timeout_secs),
      ("shutdown_grace_secs", self.server.shutdown_grace_secs),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
      return Err(ConfigError::Invalid(format!("server.{name} must be > 0")));
    }
    if self.upstream.base_url.is_empty() {
      return Err(ConfigError::Invalid("upstream.base_url is empty".into()));
    }
    if !self.upstream.base_url.ends_with('/') {
      return Err(ConfigError::Invalid(format!(
        "upstream.base_url must end with '/': {}",
        self.upstream.base_url
      )));
    }
    Ok(())
  }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
  let content = std::fs::read_to_string(path)?;
  Ok(toml::from_str::<AppConfig>(&content)?)
}

/// Attempt to load `AppConfig` from PROBLEMSET_CONFIG_PATH. On any IO/parse error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var(CONFIG_PATH_ENV).ok()?;
  match load_config(Path::new(&path)) {
    Ok(cfg) => {
      info!(target: "problemset_backend", %path, tags = cfg.tags.len(), "Loaded config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "problemset_backend", %path, error = %e, "Failed to load config; using defaults");
      None
    }
  }
}
