//! Minimal client for the upstream problemset API.
//!
//! One GET per query, no retries. Calls are instrumented and log tag lists,
//! status codes, latencies and result sizes (never full bodies).

use std::time::Instant;

use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use crate::config::UpstreamConfig;
use crate::domain::Problem;
use crate::logic::sort_by_rating;
use crate::util::trunc_for_log;

/// Separator the provider expects between tags in a single `tags` parameter.
pub const TAG_SEPARATOR: &str = ";";

#[derive(Debug, Error)]
pub enum UpstreamError {
  /// Transport failure: connect, TLS, or reading the body.
  #[error("fetch error: {0}")]
  Fetch(#[from] reqwest::Error),
  #[error("fetch error: upstream returned HTTP {status}: {body_preview}")]
  Status { status: StatusCode, body_preview: String },
  #[error("decode error: {0}")]
  Decode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ProblemsetClient {
  client: reqwest::Client,
  endpoint: String,
  user_agent: String,
}

impl ProblemsetClient {
  pub fn new(cfg: &UpstreamConfig) -> Result<Self, UpstreamError> {
    let client = reqwest::Client::builder().build()?;
    Ok(Self::with_client(client, cfg))
  }

  pub fn with_client(client: reqwest::Client, cfg: &UpstreamConfig) -> Self {
    Self {
      client,
      endpoint: format!("{}{}", cfg.base_url, cfg.method),
      user_agent: cfg.user_agent.clone(),
    }
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  /// Fetch problems for one tag. Sorted by rating.
  pub async fn fetch_by_tag(&self, tag: &str) -> Result<Vec<Problem>, UpstreamError> {
    self.fetch(&[tag]).await
  }

  /// Fetch problems carrying all of `tags`. Sorted by rating.
  ///
  /// Tags are joined with `;` into one parameter; an empty tag is sent as-is
  /// and the provider answers with its full catalog.
  #[instrument(level = "info", skip(self), fields(endpoint = %self.endpoint))]
  pub async fn fetch<S>(&self, tags: &[S]) -> Result<Vec<Problem>, UpstreamError>
  where
    S: AsRef<str> + std::fmt::Debug,
  {
    let joined = tags.iter().map(|t| t.as_ref()).collect::<Vec<&str>>().join(TAG_SEPARATOR);
    let start = Instant::now();

    let res = self.client.get(&self.endpoint)
      .header(USER_AGENT, &self.user_agent)
      .query(&[("tags", joined.as_str())])
      .send().await
      .map_err(|e| {
        error!(target: "upstream", tags = %joined, error = %e, "Upstream request failed");
        UpstreamError::Fetch(e)
      })?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let body_preview = trunc_for_log(&body, 200);
      error!(target: "upstream", tags = %joined, %status, body = %body_preview, "Upstream returned non-success status");
      return Err(UpstreamError::Status { status, body_preview });
    }

    let bytes = res.bytes().await?;
    let mut problems = decode_problems(&bytes)?;
    sort_by_rating(&mut problems);

    debug!(target: "upstream", tags = %joined, count = problems.len(), elapsed = ?start.elapsed(), "Upstream problems fetched");
    Ok(problems)
  }
}

// --- Envelope DTOs ---

#[derive(Deserialize)]
struct ProblemsetEnvelope {
  status: String,
  #[serde(default)] comment: Option<String>,
  #[serde(default)] result: ProblemsetResult,
}

#[derive(Deserialize, Default)]
struct ProblemsetResult {
  #[serde(default)] problems: Vec<Problem>,
}

/// Decode the envelope and hand back its problems in upstream order.
///
/// The envelope status is not enforced: a non-`OK` status is logged and the
/// (usually empty) problem list is returned as-is.
pub fn decode_problems(body: &[u8]) -> Result<Vec<Problem>, UpstreamError> {
  let envelope: ProblemsetEnvelope = serde_json::from_slice(body)?;
  if envelope.status != "OK" {
    warn!(
      target: "upstream",
      status = %envelope.status,
      comment = %envelope.comment.as_deref().unwrap_or(""),
      "Upstream envelope status is not OK; passing result through"
    );
  }
  Ok(envelope.result.problems)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_envelope_in_upstream_order() {
    let body = br#"{
      "status": "OK",
      "result": {
        "problems": [
          {"contestId": 2, "index": "B", "name": "b", "type": "PROGRAMMING", "rating": 1600, "tags": ["dp"]},
          {"contestId": 1, "index": "A", "name": "a", "type": "PROGRAMMING", "rating": 900, "tags": ["dp", "math"]}
        ],
        "problemStatistics": [{"contestId": 2, "index": "B", "solvedCount": 10}]
      }
    }"#;
    let problems = decode_problems(body).unwrap();
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].rating, 1600);
    assert_eq!(problems[1].tags, vec!["dp", "math"]);
  }

  #[test]
  fn failed_status_passes_through() {
    let body = br#"{"status": "FAILED", "comment": "tags: unknown"}"#;
    let problems = decode_problems(body).unwrap();
    assert!(problems.is_empty());
  }

  #[test]
  fn malformed_body_is_decode_error() {
    let err = decode_problems(b"<html>502</html>").unwrap_err();
    assert!(matches!(err, UpstreamError::Decode(_)));
    assert!(err.to_string().starts_with("decode error:"));
  }

  #[test]
  fn endpoint_joins_base_and_method() {
    let cfg = UpstreamConfig {
      base_url: "http://127.0.0.1:9/api/".into(),
      ..UpstreamConfig::default()
    };
    let client = ProblemsetClient::with_client(reqwest::Client::new(), &cfg);
    assert_eq!(client.endpoint(), "http://127.0.0.1:9/api/problemset.problems");
  }
}
