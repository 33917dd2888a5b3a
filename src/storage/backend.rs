//! Abstract object store trait.
//!
//! The gateway asks three things of a store: whether an object exists,
//! its metadata (for HEAD), and a readable stream for an object that
//! does.  Every backend implements [`ObjectStore`] in terms of those calls.

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use tokio::io::AsyncRead;

/// Byte stream over an object's contents.
///
/// Dropping the reader releases the underlying connection or buffer.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata the store reports for an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Size in bytes, if the store reported it.
    pub content_length: Option<u64>,
    /// Entity tag, quoted as the store returned it.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<SystemTime>,
}

/// An opened object: its byte stream plus the metadata returned with it.
pub struct ObjectBody {
    /// Streaming contents.
    pub reader: ObjectReader,
    pub meta: ObjectMeta,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Async read-only object store contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Check whether `key` exists in `bucket`.
    ///
    /// A clean "not found" (missing key or missing bucket) is `Ok(false)`.
    /// Any other backend failure is returned as an error.
    fn exists(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>>;

    /// Fetch metadata for `key` in `bucket` without reading its contents.
    ///
    /// The default opens the object and drops the reader; backends with a
    /// cheaper metadata call override it.
    fn stat(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectMeta>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move { Ok(self.open(&bucket, &key).await?.meta) })
    }

    /// Open `key` in `bucket` for streaming.
    fn open(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectBody>> + Send + '_>>;
}
