//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures surface as 500 with the error text.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{error, field, instrument, Span};

use crate::domain::{Problem, ProblemQuery, TagMatch};
use crate::logic::run_query;
use crate::protocol::{TagQuery, TagsQuery};
use crate::state::AppState;
use crate::upstream::UpstreamError;

/// Upstream failure as seen by the caller: always a plain-text 500.
#[derive(Debug)]
pub struct ApiError(UpstreamError);

impl From<UpstreamError> for ApiError {
  fn from(e: UpstreamError) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
  }
}

type ProblemsResult = Result<Json<Vec<Problem>>, ApiError>;

async fn serve_query(state: &AppState, query: ProblemQuery) -> ProblemsResult {
  match run_query(&state.upstream, &query).await {
    Ok(problems) => Ok(Json(problems)),
    Err(e) => {
      error!(target: "problemset_backend", tags = ?query.tags, mode = query.mode.as_str(), error = %e, "Query failed");
      Err(e.into())
    }
  }
}

#[instrument(level = "info")]
pub async fn http_health() -> &'static str { "ok" }

#[instrument(level = "info", skip(state))]
pub async fn http_tags(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
  Json(state.catalog.as_slice().to_vec())
}

#[instrument(level = "info", skip(state, pairs), fields(tag = field::Empty))]
pub async fn http_problems_by_tag(
  State(state): State<Arc<AppState>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> ProblemsResult {
  let q = TagQuery::from_pairs(&pairs);
  Span::current().record("tag", q.tag.as_str());
  serve_query(&state, q.into_query(TagMatch::Any)).await
}

#[instrument(level = "info", skip(state, pairs), fields(tag = field::Empty))]
pub async fn http_problems_by_tag_only(
  State(state): State<Arc<AppState>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> ProblemsResult {
  let q = TagQuery::from_pairs(&pairs);
  Span::current().record("tag", q.tag.as_str());
  serve_query(&state, q.into_query(TagMatch::Exact)).await
}

#[instrument(level = "info", skip(state, pairs), fields(tags = field::Empty))]
pub async fn http_problems_by_tags(
  State(state): State<Arc<AppState>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> ProblemsResult {
  let q = TagsQuery::from_pairs(&pairs);
  Span::current().record("tags", q.tags.as_str());
  serve_query(&state, q.into_query(TagMatch::Any)).await
}

#[instrument(level = "info", skip(state, pairs), fields(tags = field::Empty))]
pub async fn http_problems_by_tags_only(
  State(state): State<Arc<AppState>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> ProblemsResult {
  let q = TagsQuery::from_pairs(&pairs);
  Span::current().record("tags", q.tags.as_str());
  serve_query(&state, q.into_query(TagMatch::Exact)).await
}
