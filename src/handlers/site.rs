//! Static site handler.
//!
//! Every request that is not an internal endpoint lands here.  The
//! handler derives the bucket and key, runs the fallback search, opens
//! the object and streams it back.  HEAD only fetches metadata.  The object reader is moved into the
//! response body, so it is released when the body finishes, fails, or is
//! dropped because the client went away.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::errors::GatewayError;
use crate::metrics;
use crate::resolver::{self, Resolution};
use crate::storage::{ObjectBody, ObjectMeta, ObjectReader};
use crate::AppState;

/// Serve the object addressed by the request's host and path.
pub async fn serve_site(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, GatewayError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(GatewayError::MethodNotAllowed);
    }

    let host = request_host(&headers, &uri).unwrap_or_default();
    let location = resolver::locate(host, uri.path()).map_err(|err| {
        warn!(host = %host, path = %uri.path(), "Could not derive object location: {}", err);
        err
    })?;

    let resolution = match resolver::resolve(
        state.store.as_ref(),
        &location.bucket,
        &location.key,
    )
    .await
    {
        Ok(resolution) => resolution,
        Err(GatewayError::NotFound { bucket, key }) => {
            warn!(bucket = %bucket, object = %key, "Object not found");
            metrics::record_resolution("not_found");
            return Err(GatewayError::NotFound { bucket, key });
        }
        Err(GatewayError::Storage(err)) => {
            error!(
                bucket = %location.bucket,
                object = %location.key,
                "Failed to check object existence: {:#}",
                err
            );
            return Err(GatewayError::Storage(err));
        }
        Err(other) => return Err(other),
    };
    metrics::record_resolution(resolution.lookup.as_str());
    debug!(
        bucket = %resolution.bucket,
        object = %resolution.key,
        lookup = resolution.lookup.as_str(),
        "Resolved object"
    );

    let cache_max_age = state.config.site.cache_max_age;

    if method == Method::HEAD {
        let meta = state
            .store
            .stat(&resolution.bucket, &resolution.key)
            .await
            .map_err(|err| {
                error!(
                    bucket = %resolution.bucket,
                    object = %resolution.key,
                    "Failed to stat object in storage: {:#}",
                    err
                );
                GatewayError::Storage(err)
            })?;
        return Ok(build_response(&resolution, meta, Body::empty(), cache_max_age));
    }

    let ObjectBody { reader, meta } = state
        .store
        .open(&resolution.bucket, &resolution.key)
        .await
        .map_err(|err| {
            error!(
                bucket = %resolution.bucket,
                object = %resolution.key,
                "Failed to get object from storage: {:#}",
                err
            );
            GatewayError::Storage(err)
        })?;

    let body = stream_body(&resolution, reader);
    Ok(build_response(&resolution, meta, body, cache_max_age))
}

/// Host the client asked for: the `Host` header, or the URI authority
/// for HTTP/2 requests that only carry `:authority`.
fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
}

fn stream_body(resolution: &Resolution, reader: ObjectReader) -> Body {
    let bucket = resolution.bucket.clone();
    let key = resolution.key.clone();
    let stream = ReaderStream::new(reader)
        .inspect_ok(|chunk| metrics::record_bytes_sent(chunk.len() as u64))
        .inspect_err(move |err| {
            error!(bucket = %bucket, object = %key, "Failed to write response: {}", err);
        });
    Body::from_stream(stream)
}

fn build_response(
    resolution: &Resolution,
    meta: ObjectMeta,
    body: Body,
    cache_max_age: u32,
) -> Response {
    let ObjectMeta {
        content_length,
        etag,
        last_modified,
    } = meta;

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let hdrs = response.headers_mut();

    hdrs.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(resolution.content_type()),
    );
    if let Ok(val) = HeaderValue::from_str(&format!("public, max-age={cache_max_age}")) {
        hdrs.insert(header::CACHE_CONTROL, val);
    }
    if let Some(len) = content_length {
        hdrs.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if let Some(val) = etag.and_then(|e| HeaderValue::from_str(&e).ok()) {
        hdrs.insert(header::ETAG, val);
    }
    if let Some(modified) = last_modified {
        if let Ok(val) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
            hdrs.insert(header::LAST_MODIFIED, val);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_host_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("a.example.com"));
        let uri: Uri = "http://b.example.com/x".parse().unwrap();

        assert_eq!(request_host(&headers, &uri), Some("a.example.com"));
    }

    #[test]
    fn test_request_host_falls_back_to_authority() {
        let headers = HeaderMap::new();
        let uri: Uri = "https://b.example.com:8443/x".parse().unwrap();

        assert_eq!(request_host(&headers, &uri), Some("b.example.com:8443"));
    }

    #[test]
    fn test_request_host_missing() {
        let headers = HeaderMap::new();
        let uri: Uri = "/x".parse().unwrap();

        assert_eq!(request_host(&headers, &uri), None);
    }
}
