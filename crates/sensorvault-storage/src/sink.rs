use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// Metadata for one stored object, as returned by [`ObjectSink::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMeta {
    /// Object name relative to its container (e.g. `hourly/20240101_000000.csv`)
    pub name: String,
    pub size: u64,
    /// Not every backend reports modification times
    pub last_modified: Option<DateTime<Utc>>,
}

/// Uniform put/get/list/delete over a named container.
///
/// Implementations perform no retries. Objects are addressed by name only,
/// so writing the same name twice replaces the first object.
#[async_trait]
pub trait ObjectSink: Send + Sync {
    /// Short backend label for logs and status output
    fn backend(&self) -> &str;

    /// Create the container if it does not exist. Idempotent.
    async fn ensure_container(&self, container: &str) -> Result<()>;

    /// Write `bytes` under `name`, replacing any existing object.
    async fn put(&self, container: &str, name: &str, bytes: Bytes, content_type: &str)
        -> Result<()>;

    /// Fails with `ObjectNotFound` if the object is absent.
    async fn get(&self, container: &str, name: &str) -> Result<Bytes>;

    /// List objects ordered by name, optionally filtered by a name prefix
    /// and truncated to `limit` entries.
    ///
    /// This is a single page. Use [`ObjectSink::list_after`] with the last
    /// returned name to read further.
    async fn list(
        &self,
        container: &str,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ObjectMeta>>;

    /// Next page of [`ObjectSink::list`]: objects whose name sorts strictly
    /// after `start_after`.
    async fn list_after(
        &self,
        container: &str,
        prefix: Option<&str>,
        start_after: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ObjectMeta>> {
        let mut objects = self.list(container, prefix, None).await?;
        objects.retain(|o| o.name.as_str() > start_after);
        if let Some(limit) = limit {
            objects.truncate(limit);
        }
        Ok(objects)
    }

    /// Deleting an absent object succeeds.
    async fn delete(&self, container: &str, name: &str) -> Result<()>;
}
