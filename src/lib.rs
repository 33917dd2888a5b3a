//! staticgate library -- static site gateway for S3-compatible storage.
//!
//! Each request's subdomain picks a bucket, its path picks an object key
//! (with `index.html` and `.html` fallbacks), and the object is streamed
//! back with an extension-derived content type.

use std::sync::Arc;

pub mod config;
pub mod content_type;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::storage::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
///
/// Built once in `main` and never mutated afterwards.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Object store client.
    pub store: Arc<dyn ObjectStore>,
    /// Prometheus handle, present when metrics are enabled.
    pub metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
}
