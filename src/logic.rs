//! Core behaviors behind the problem endpoints:
//!   - ordering by rating
//!   - the "only" tag-count filter
//!   - composing fetch → filter for one query

use tracing::{info, instrument};

use crate::domain::{Problem, ProblemQuery, TagMatch};
use crate::upstream::{ProblemsetClient, UpstreamError};

/// Ascending by rating. Stable, so equal ratings keep upstream order.
pub fn sort_by_rating(problems: &mut [Problem]) {
  problems.sort_by_key(|p| p.rating);
}

/// Narrow `problems` for a query of `requested` tags.
///
/// `Exact` keeps problems with exactly `requested` tags and does not look at
/// which tags they are.
pub fn apply_filter(problems: Vec<Problem>, mode: TagMatch, requested: usize) -> Vec<Problem> {
  match mode {
    TagMatch::Any => problems,
    TagMatch::Exact => problems.into_iter().filter(|p| p.tags.len() == requested).collect(),
  }
}

/// Fetch (already rating-sorted) and filter for one query.
#[instrument(level = "info", skip(client, query), fields(mode = query.mode.as_str(), tags = ?query.tags))]
pub async fn run_query(client: &ProblemsetClient, query: &ProblemQuery) -> Result<Vec<Problem>, UpstreamError> {
  let fetched = client.fetch(query.tags.as_slice()).await?;
  let fetched_count = fetched.len();
  let problems = apply_filter(fetched, query.mode, query.tags.len());
  info!(target: "problemset_backend", fetched = fetched_count, returned = problems.len(), "Query served");
  Ok(problems)
}
