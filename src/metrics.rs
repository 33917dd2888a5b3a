//! Prometheus metrics for staticgate.
//!
//! Installs a Prometheus recorder using `metrics-exporter-prometheus`,
//! defines metric name constants, provides an axum middleware for HTTP
//! RED metrics, and exposes the `/_metrics` endpoint handler.

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::AppState;

// -- Metric name constants ----------------------------------------------------

/// Total HTTP requests (counter). Labels: method, route, status.
pub const HTTP_REQUESTS_TOTAL: &str = "staticgate_http_requests_total";

/// HTTP request duration in seconds (histogram). Labels: method, route.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "staticgate_http_request_duration_seconds";

/// Resolution outcomes (counter). Labels: outcome.
pub const RESOLUTIONS_TOTAL: &str = "staticgate_resolutions_total";

/// Total bytes streamed in response bodies (counter).
pub const BYTES_SENT_TOTAL: &str = "staticgate_bytes_sent_total";

/// Path of the health probe.
pub const HEALTH_PATH: &str = "/_health";

/// Path of the Prometheus scrape endpoint.
pub const METRICS_PATH: &str = "/_metrics";

// -- Recorder installation ----------------------------------------------------

/// The `metrics` facade accepts exactly one recorder per process.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus metrics recorder and register metric
/// descriptions. Idempotent; returns a handle for rendering.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");
            describe_metrics();
            handle
        })
        .clone()
}

fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(RESOLUTIONS_TOTAL, "Object resolutions by outcome");
    describe_counter!(BYTES_SENT_TOTAL, "Total bytes sent (response bodies)");
}

/// Record the outcome of one fallback search.
pub fn record_resolution(outcome: &'static str) {
    counter!(RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record `n` body bytes sent to a client.
pub fn record_bytes_sent(n: u64) {
    counter!(BYTES_SENT_TOTAL).increment(n);
}

// -- Metrics middleware -------------------------------------------------------

/// Axum middleware that records HTTP RED metrics for every request.
///
/// Excludes the scrape endpoint from self-instrumentation.
/// Must be the outermost layer so it captures the full request lifecycle.
pub async fn metrics_middleware(
    req: Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    if req.uri().path() == METRICS_PATH {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let route = route_label(req.uri().path());

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "route" => route, "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "route" => route).record(duration);

    response
}

/// Collapse a request path to a fixed route label.
///
/// Site paths are unbounded, so they all share the `site` label.
fn route_label(path: &str) -> &'static str {
    match path {
        HEALTH_PATH => "health",
        METRICS_PATH => "metrics",
        _ => "site",
    }
}

// -- Metrics endpoint handler -------------------------------------------------

/// `GET /_metrics` -- Render Prometheus exposition format text.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// -- Tests --------------------------------------------------------------------
