//! Request-to-object resolution.
//!
//! Turns the `Host` header and URL path of an inbound request into a
//! `(bucket, key)` pair, then probes the store with a fixed fallback
//! order to find the object that should be served:
//!
//! 1. the key as given (`docs/` has already become `docs/index.html`);
//! 2. the key with `.html` appended, unless it already ends in `.html`.
//!
//! Bucket selection is one subdomain, one bucket: `blog.static.example.com`
//! reads from bucket `blog`.  The key is used as-is inside that bucket,
//! with no bucket-name prefix.
//!
//! Nothing here is cached.  Every request derives its bucket and key
//! from scratch.

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::content_type::content_type;
use crate::errors::GatewayError;
use crate::storage::ObjectStore;

/// Document served for directory-style paths.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Suffix tried when the exact key is missing.
pub const HTML_SUFFIX: &str = ".html";

/// Longest label allowed in a DNS host name.
const MAX_LABEL_LEN: usize = 63;

/// Candidate `(bucket, key)` for a request, before any store lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Which candidate in the fallback order matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The normalized key itself.
    Exact,
    /// The normalized key with `.html` appended.
    HtmlSuffix,
}

impl Lookup {
    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::HtmlSuffix => "html_fallback",
        }
    }
}

/// An object confirmed to exist in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub bucket: String,
    pub key: String,
    pub lookup: Lookup,
}

impl Resolution {
    /// `Content-Type` for the resolved key.
    pub fn content_type(&self) -> &'static str {
        content_type(&self.key)
    }
}

// -- Bucket extraction --------------------------------------------------------

/// Derive the bucket name from a `Host` header value.
///
/// The host must have more than two dot-separated labels; the first one
/// is the bucket.  A trailing `:port` and a trailing root `.` are ignored
/// and the result is lower-cased.
///
/// Returns `None` when no bucket can be derived: too few labels, an IP
/// literal, or anything that is not a syntactically valid host name.
pub fn extract_bucket(host: &str) -> Option<String> {
    let host = strip_port(host.trim());
    let host = host.strip_suffix('.').unwrap_or(host);

    // Bracketed IPv6 literal, with or without a port.
    if host.is_empty() || host.starts_with('[') {
        return None;
    }

    let host = host.to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    if labels.len() <= 2 {
        return None;
    }
    if !labels.iter().all(|label| is_valid_label(label)) {
        return None;
    }
    // IPv4 literal.
    if labels
        .iter()
        .all(|label| label.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    Some(labels[0].to_string())
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

// -- Path normalization -------------------------------------------------------

/// Percent-decode a raw request path.
///
/// Returns `None` if the decoded bytes are not valid UTF-8.
pub fn decode_path(raw_path: &str) -> Option<String> {
    percent_decode_str(raw_path)
        .decode_utf8()
        .ok()
        .map(|path| path.into_owned())
}

/// Turn a decoded URL path into a candidate object key.
///
/// The path is cleaned lexically: empty and `.` segments are dropped and
/// `..` removes the previous segment, never climbing above the root.  The
/// resulting key has no leading slash, no `//` and no dot segments.  An
/// empty result, or a path ending in `/`, gets [`INDEX_DOCUMENT`] appended.
pub fn normalize_key(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    let key = segments.join("/");
    if key.is_empty() {
        INDEX_DOCUMENT.to_string()
    } else if path.ends_with('/') {
        format!("{key}/{INDEX_DOCUMENT}")
    } else {
        key
    }
}

/// Derive the candidate `(bucket, key)` for a request without touching
/// the store.
pub fn locate(host: &str, raw_path: &str) -> Result<ObjectLocation, GatewayError> {
    let bucket = extract_bucket(host).ok_or_else(|| GatewayError::InvalidHost {
        host: host.to_string(),
    })?;
    let path = decode_path(raw_path).ok_or_else(|| GatewayError::InvalidPath {
        path: raw_path.to_string(),
    })?;

    Ok(ObjectLocation {
        bucket,
        key: normalize_key(&path),
    })
}

// -- Existence fallback -------------------------------------------------------

/// Find the object to serve for `key` in `bucket`.
///
/// Tries the exact key, then `key + ".html"` when `key` does not already
/// end in `.html`.  Store errors are returned as [`GatewayError::Storage`]
/// and are never read as "missing".
pub async fn resolve(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Resolution, GatewayError> {
    if store.exists(bucket, key).await? {
        return Ok(Resolution {
            bucket: bucket.to_string(),
            key: key.to_string(),
            lookup: Lookup::Exact,
        });
    }

    if !key.ends_with(HTML_SUFFIX) {
        let html_key = format!("{key}{HTML_SUFFIX}");
        debug!("Exact key {}/{} missing, trying {}", bucket, key, html_key);
        if store.exists(bucket, &html_key).await? {
            return Ok(Resolution {
                bucket: bucket.to_string(),
                key: html_key,
                lookup: Lookup::HtmlSuffix,
            });
        }
    }

    Err(GatewayError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}
