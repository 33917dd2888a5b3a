//! Gateway error types.
//!
//! Every variant maps to a fixed HTTP status and a fixed plain-text body.
//! The enum implements [`axum::response::IntoResponse`] so handlers can
//! simply return `Err(GatewayError::InvalidHost { .. })`.  Variant fields
//! are for logs only and never reach the client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Request-level failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No bucket could be derived from the Host header.
    #[error("Invalid host")]
    InvalidHost { host: String },

    /// The request path did not decode to valid UTF-8.
    #[error("Invalid path")]
    InvalidPath { path: String },

    /// No object matched after the fallback search.
    #[error("Not found")]
    NotFound { bucket: String, key: String },

    /// Only GET and HEAD are served.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Store failure on an existence check or open.
    #[error("Internal server error")]
    Storage(#[from] anyhow::Error),
}

impl GatewayError {
    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidHost { .. } => StatusCode::BAD_REQUEST,
            GatewayError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = format!("{self}\n");

        let mut response = (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            body,
        )
            .into_response();

        if matches!(self, GatewayError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_request_id_format() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::InvalidHost {
                host: "example.com".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::InvalidPath { path: "/%ff".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::NotFound {
                bucket: "b".into(),
                key: "k".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            GatewayError::Storage(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_storage_error_body_is_generic() {
        let err = GatewayError::Storage(anyhow::anyhow!(
            "S3 get_object: connection refused to minio:9000"
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );

        let body = body_string(response).await;
        assert_eq!(body, "Internal server error\n");
        assert!(!body.contains("minio"));
    }

    #[tokio::test]
    async fn test_not_found_body_omits_key() {
        let response = GatewayError::NotFound {
            bucket: "site".into(),
            key: "secret/plan.html".into(),
        }
        .into_response();
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(body_string(response).await, "Not found\n");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = GatewayError::MethodNotAllowed.into_response();
        assert_eq!(response.headers()["allow"], "GET, HEAD");
    }
}
