//! Shared utilities for integration tests: a mock problemset upstream and
//! helpers to drive the router without a socket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use problemset_backend::config::{ServerConfig, TagCatalog, UpstreamConfig};
use problemset_backend::upstream::ProblemsetClient;
use problemset_backend::{build_router, AppState};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A running mock upstream and the `tags` values it has been asked for.
pub struct MockUpstream {
    pub base_url: String,
    pub seen_tags: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn seen(&self) -> Vec<String> {
        self.seen_tags.lock().unwrap().clone()
    }
}

/// Start a mock `problemset.problems` endpoint answering every call with
/// `status` and `body` after `delay`.
pub async fn start_mock_upstream(status: StatusCode, body: String, delay: Duration) -> MockUpstream {
    let seen_tags = Arc::new(Mutex::new(Vec::new()));
    let seen = seen_tags.clone();

    let app = Router::new().route(
        "/api/problemset.problems",
        get(move |Query(q): Query<HashMap<String, String>>| {
            let seen = seen.clone();
            let body = body.clone();
            async move {
                seen.lock().unwrap().push(q.get("tags").cloned().unwrap_or_default());
                tokio::time::sleep(delay).await;
                (status, [(header::CONTENT_TYPE, "application/json")], body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream {
        base_url: format!("http://{}/api/", addr),
        seen_tags,
    }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn problem(name: &str, rating: i32, tags: &[&str]) -> Value {
    json!({
        "contestId": 1000,
        "index": name,
        "name": name,
        "type": "PROGRAMMING",
        "rating": rating,
        "tags": tags,
    })
}

pub fn envelope(problems: Vec<Value>) -> String {
    json!({ "status": "OK", "result": { "problems": problems, "problemStatistics": [] } }).to_string()
}

/// Router wired to the given upstream base URL.
pub fn app_for(base_url: &str) -> Router {
    app_with(base_url, &ServerConfig::default())
}

pub fn app_with(base_url: &str, server: &ServerConfig) -> Router {
    let cfg = UpstreamConfig {
        base_url: base_url.to_string(),
        ..UpstreamConfig::default()
    };
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let upstream = ProblemsetClient::with_client(client, &cfg);
    let state = Arc::new(AppState::from_parts(upstream, TagCatalog::default()));
    build_router(state, server)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// `name` of every returned problem, in order.
    pub fn names(&self) -> Vec<String> {
        self.json()
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn ratings(&self) -> Vec<i64> {
        self.json()
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["rating"].as_i64().unwrap())
            .collect()
    }
}

/// GET `uri` through the router.
pub async fn get_uri(app: Router, uri: &str) -> TestResponse {
    let res = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        request_id,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
