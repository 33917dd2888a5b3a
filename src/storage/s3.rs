//! S3-compatible object store client.
//!
//! Talks to MinIO, AWS S3, or any other S3-compatible endpoint through
//! the AWS SDK.  Each site bucket is a real bucket on the remote store;
//! object keys are passed through unchanged.
//!
//! Existence checks and HEAD metadata use HeadObject, reads use GetObject
//! with the response body streamed rather than buffered.

use aws_sdk_s3::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;
use tracing::{debug, info};

use super::backend::{ObjectBody, ObjectMeta, ObjectStore};
use crate::config::S3StorageConfig;

/// Object store backed by an S3-compatible service.
pub struct S3Store {
    /// AWS S3 SDK client.
    client: Client,
}

impl S3Store {
    /// Create a new client from the `storage.s3` config section.
    ///
    /// Requests are signed with the static access/secret key pair from the
    /// config, which `Config::check` requires to be set.
    pub async fn new(config: &S3StorageConfig) -> anyhow::Result<Self> {
        let endpoint = endpoint_url(&config.endpoint, config.use_ssl);

        let creds = aws_sdk_s3::config::Credentials::new(
            &config.access_key,
            &config.secret_key,
            None, // session_token
            None, // expiry
            "staticgate-config",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(creds)
            .load()
            .await;

        let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style);

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            endpoint = %endpoint,
            region = %config.region,
            path_style = config.force_path_style,
            "S3 object store client initialized"
        );

        Ok(Self { client })
    }

    /// Map an AWS SDK error to an anyhow error with context.
    fn map_sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
        anyhow::anyhow!("S3 {context}: {err}")
    }
}

/// Build the endpoint URL for the SDK.
///
/// MinIO-style endpoints are usually given as bare `host:port`; the scheme
/// is then chosen by `use_ssl`.  An endpoint that already carries a scheme
/// is used verbatim.
pub fn endpoint_url(endpoint: &str, use_ssl: bool) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let scheme = if use_ssl { "https" } else { "http" };
    format!("{scheme}://{endpoint}")
}

impl ObjectStore for S3Store {
    fn exists(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 head_object: bucket={} key={}", bucket, key);

            match self
                .client
                .head_object()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    // HeadObject has no error body, so a missing bucket and a
                    // missing key both surface as NotFound.
                    let service_err = e.into_service_error();
                    if service_err.is_not_found() {
                        Ok(false)
                    } else {
                        Err(Self::map_sdk_error("head_object", service_err))
                    }
                }
            }
        })
    }

    fn open(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectBody>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 get_object: bucket={} key={}", bucket, key);

            let resp = self
                .client
                .get_object()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("get_object", e.into_service_error()))?;

            let meta = object_meta(resp.content_length(), resp.e_tag(), resp.last_modified());

            Ok(ObjectBody {
                reader: Box::pin(resp.body.into_async_read()),
                meta,
            })
        })
    }

    fn stat(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectMeta>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!("S3 head_object (stat): bucket={} key={}", bucket, key);

            let resp = self
                .client
                .head_object()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("head_object", e.into_service_error()))?;

            Ok(object_meta(
                resp.content_length(),
                resp.e_tag(),
                resp.last_modified(),
            ))
        })
    }
}

fn object_meta(
    content_length: Option<i64>,
    etag: Option<&str>,
    last_modified: Option<&aws_sdk_s3::primitives::DateTime>,
) -> ObjectMeta {
    ObjectMeta {
        content_length: content_length.and_then(|n| u64::try_from(n).ok()),
        etag: etag.map(str::to_string),
        last_modified: last_modified.and_then(|dt| SystemTime::try_from(*dt).ok()),
    }
}
