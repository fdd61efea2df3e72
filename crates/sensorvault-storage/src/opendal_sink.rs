// OpenDAL-based sink implementation
//
// One operator serves every container: a container is a top-level directory
// below the operator root, so `sensor-archive/hourly/20240101_000000.csv` is
// object `hourly/20240101_000000.csv` in container `sensor-archive`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use opendal::{ErrorKind, Operator};
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::sink::{ObjectMeta, ObjectSink};

#[derive(Clone)]
pub struct OpenDalSink {
    operator: Operator,
    backend: String,
}

impl OpenDalSink {
    pub fn new(operator: Operator) -> Self {
        let backend = operator.info().scheme().to_string();
        Self { operator, backend }
    }

    /// Process-local sink backed by the OpenDAL memory service.
    pub fn memory() -> anyhow::Result<Self> {
        let operator = Operator::new(opendal::services::Memory::default())?.finish();
        Ok(Self::new(operator))
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

fn container_root(container: &str) -> String {
    format!("{}/", container.trim_end_matches('/'))
}

fn object_path(container: &str, name: &str) -> String {
    format!("{}{}", container_root(container), name.trim_start_matches('/'))
}

/// Modification time of a listed or stat'ed object.
///
/// `Metadata::last_modified` yields `opendal::raw::Timestamp`, a jiff-backed
/// wrapper whose `Display` is RFC 3339; it reaches chrono through that text.
fn modified_at(meta: &opendal::Metadata) -> Option<DateTime<Utc>> {
    meta.last_modified().and_then(|t| parse_modified(&t.to_string()))
}

/// Accept RFC 3339 and the `2024-01-01 00:00:00 UTC` form that chrono-based
/// opendal releases displayed.
fn parse_modified(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f UTC")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn backend_error(operation: &'static str, path: &str, err: opendal::Error) -> StorageError {
    StorageError::Backend {
        operation,
        path: path.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl ObjectSink for OpenDalSink {
    fn backend(&self) -> &str {
        &self.backend
    }

    #[instrument(skip(self), fields(backend = %self.backend))]
    async fn ensure_container(&self, container: &str) -> Result<()> {
        let root = container_root(container);
        let unavailable = |err: opendal::Error| StorageError::Unavailable {
            container: container.to_string(),
            reason: err.to_string(),
        };

        match self.operator.create_dir(&root).await {
            Ok(()) => {
                debug!("Container ready");
                Ok(())
            }
            // Flat key-value backends have no directories; reachability is all we can verify
            Err(e) if e.kind() == ErrorKind::Unsupported => {
                self.operator.check().await.map_err(unavailable)
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let path = object_path(container, name);
        let size = bytes.len();

        let written = if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            self.operator
                .write_with(&path, bytes)
                .content_type(content_type)
                .await
        } else {
            self.operator.write(&path, bytes).await
        };

        written.map(|_| ()).map_err(|e| StorageError::PutFailed {
            name: name.to_string(),
            reason: e.to_string(),
            temporary: e.is_temporary(),
        })?;

        debug!(path = %path, size, content_type, "Object written");
        Ok(())
    }

    async fn get(&self, container: &str, name: &str) -> Result<Bytes> {
        let path = object_path(container, name);
        match self.operator.read(&path).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::ObjectNotFound {
                container: container.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(backend_error("read", &path, e)),
        }
    }

    async fn list(
        &self,
        container: &str,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ObjectMeta>> {
        let root = container_root(container);
        let entries = match self.operator.list_with(&root).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(backend_error("list", &root, e)),
        };

        let mut listed: Vec<(String, opendal::Metadata)> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode().is_file())
            .filter_map(|entry| {
                let name = entry.path().strip_prefix(&root)?.to_string();
                let matches = prefix.map_or(true, |p| name.starts_with(p));
                matches.then(|| (name, entry.metadata().clone()))
            })
            .collect();

        listed.sort_by(|a, b| a.0.cmp(&b.0));
        listed.dedup_by(|a, b| a.0 == b.0);
        if let Some(limit) = limit {
            listed.truncate(limit);
        }

        let mut objects = Vec::with_capacity(listed.len());
        for (name, listed_meta) in listed {
            // Listings from some services omit sizes and times; fill them in with a stat
            let meta = if listed_meta.last_modified().is_none() {
                let path = object_path(container, &name);
                match self.operator.stat(&path).await {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(backend_error("stat", &path, e)),
                }
            } else {
                listed_meta
            };

            objects.push(ObjectMeta {
                name,
                size: meta.content_length(),
                last_modified: modified_at(&meta),
            });
        }

        Ok(objects)
    }

    async fn delete(&self, container: &str, name: &str) -> Result<()> {
        let path = object_path(container, name);
        match self.operator.delete(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend_error("delete", &path, e)),
        }
    }
}
