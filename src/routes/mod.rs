//! Router assembly: HTTP endpoints, request ids, request deadline, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{body::Body, http::Request, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ServerConfig;
use crate::state::AppState;

pub mod http;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Build the application router with:
/// - `/health` and `/tags`
/// - the four `/problems` query modes
/// - a request deadline (408 once `request_timeout` elapses)
/// - a body read timeout (`read_timeout` between body frames)
/// - `x-request-id` generated when absent and echoed on the response
/// - CORS (allow any origin, read-only API)
/// - HTTP trace layer (per-request spans w/ method, path, request id; status + latency on response)
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let x_request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/health", get(http::http_health))
        .route("/tags", get(http::http_tags))
        .route("/problems", get(http::http_problems_by_tag))
        .route("/problems/multi", get(http::http_problems_by_tags))
        .route("/problems/only", get(http::http_problems_by_tag_only))
        .route("/problems/multi/only", get(http::http_problems_by_tags_only))
        .with_state(state)
        .layer(RequestBodyTimeoutLayer::new(config.read_timeout()))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %request_id,
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Outermost, so the trace span already sees the id.
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}
