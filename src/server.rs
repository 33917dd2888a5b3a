//! Axum router construction.
//!
//! The [`app`] function wires the internal endpoints and the site
//! fallback handler, and returns a ready-to-serve [`axum::Router`].
//!
//! Internal endpoints (`/_health`, `/_metrics`) answer on every host.
//! Every other path, for every method, goes to
//! [`crate::handlers::site::serve_site`], which rejects anything but
//! GET and HEAD.

use axum::{
    http::{header, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::generate_request_id;
use crate::handlers::site::serve_site;
use crate::metrics::{metrics_handler, metrics_middleware, HEALTH_PATH, METRICS_PATH};
use crate::AppState;

/// Response header carrying the per-request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Value of the `Server` response header.
pub const SERVER_NAME: &str = "staticgate";

/// Build the axum [`Router`] for the gateway.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let observability = state.config.observability.clone();
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let mut router: Router<Arc<AppState>> = Router::new();
    if observability.health_check {
        router = router.route(HEALTH_PATH, get(health_check));
    }
    if observability.metrics {
        router = router.route(METRICS_PATH, get(metrics_handler));
    }

    let router = router
        .fallback(serve_site)
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        // The timeout bounds lookup and open; body streaming runs after
        // the response is returned and is not cut off.
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(middleware::from_fn(access_log_middleware))
        .layer(TraceLayer::new_for_http());

    if observability.metrics {
        // Outermost, so it captures the full request lifecycle.
        router.layer(middleware::from_fn(metrics_middleware))
    } else {
        router
    }
}

// -- Common headers middleware -----------------------------------------------

/// Middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Server`: `staticgate`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key(REQUEST_ID_HEADER) {
        if let Ok(val) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert(REQUEST_ID_HEADER, val);
        }
    }
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));

    response
}

// -- Access log middleware ---------------------------------------------------

/// One `info` event per request, emitted once the response is ready.
async fn access_log_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let host = header_str(req.headers(), header::HOST).to_string();
    let user_agent = header_str(req.headers(), header::USER_AGENT).to_string();

    let start = Instant::now();
    let response = next.run(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    info!(
        method = %method,
        path = %path,
        host = %host,
        status = response.status().as_u16(),
        duration_ms,
        user_agent = %user_agent,
        request_id = %header_str(response.headers(), REQUEST_ID_HEADER),
        "Request handled"
    );

    response
}

fn header_str<K: header::AsHeaderName>(headers: &header::HeaderMap, name: K) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// -- Health check ------------------------------------------------------------

/// `GET /_health` -- Returns `{"status": "ok"}` with 200 OK.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
