//! In-memory object store.
//!
//! Buckets and objects live in a `tokio::sync::RwLock<HashMap<...>>`.
//! Useful for local development (optionally seeded from a directory
//! tree at startup) and as the store behind the router tests.
//!
//! Every `exists`/`stat`/`open` call is counted so callers can assert how many
//! round trips a request made.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use super::backend::{ObjectBody, ObjectMeta, ObjectStore};

/// A stored object and the time it was written.
#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    last_modified: SystemTime,
}

impl MemoryObject {
    fn meta(&self) -> ObjectMeta {
        ObjectMeta {
            content_length: Some(self.data.len() as u64),
            etag: None,
            last_modified: Some(self.last_modified),
        }
    }
}

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// bucket -> key -> object.
    buckets: tokio::sync::RwLock<HashMap<String, HashMap<String, MemoryObject>>>,
    /// Number of `exists`, `stat` and `open` calls served.
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a directory tree.
    ///
    /// Each first-level directory under `root` becomes a bucket; files
    /// below it are stored under their `/`-separated relative path.
    /// Loose files directly under `root` are ignored.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let mut buckets = HashMap::new();

        for entry in std::fs::read_dir(root.as_ref())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let bucket = entry.file_name().to_string_lossy().into_owned();
            let mut objects = HashMap::new();
            collect_files(&entry.path(), "", &mut objects)?;
            tracing::debug!("Seeded bucket {} with {} objects", bucket, objects.len());
            buckets.insert(bucket, objects);
        }

        Ok(Self {
            buckets: tokio::sync::RwLock::new(buckets),
            calls: AtomicUsize::new(0),
        })
    }

    /// Store `data` under `key` in `bucket`, creating the bucket if needed.
    pub async fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            MemoryObject {
                data: data.into(),
                last_modified: SystemTime::now(),
            },
        );
    }

    /// Total number of `exists`, `stat` and `open` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn lookup(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }
}

fn collect_files(
    dir: &Path,
    prefix: &str,
    out: &mut HashMap<String, MemoryObject>,
) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), &key, out)?;
        } else if file_type.is_file() {
            let metadata = entry.metadata()?;
            let data = std::fs::read(entry.path())?;
            out.insert(
                key,
                MemoryObject {
                    data: Bytes::from(data),
                    last_modified: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
                },
            );
        }
    }
    Ok(())
}

impl ObjectStore for MemoryStore {
    fn exists(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move { Ok(self.lookup(&bucket, &key).await.is_some()) })
    }

    fn open(
        &self,
        bucket: &str,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ObjectBody>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let object = self
                .lookup(&bucket, &key)
                .await
                .ok_or_else(|| anyhow::anyhow!("Object not found: {bucket}/{key}"))?;

            let meta = object.meta();
            Ok(ObjectBody {
                reader: Box::pin(Cursor::new(object.data)),
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
            self.lookup(&bucket, &key)
                .await
                .map(|object| object.meta())
                .ok_or_else(|| anyhow::anyhow!("Object not found: {bucket}/{key}"))
        })
    }
}
