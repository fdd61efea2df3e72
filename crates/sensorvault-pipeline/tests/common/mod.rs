#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use sensorvault_core::{SensorRecord, TimeWindow};
use sensorvault_pipeline::{ArchiveJob, ArchiveService, RetryPolicy, ServiceOptions};
use sensorvault_source::{
    Extractor, MemorySource, RangeQuery, RecordSource, SourceError, SourceRow,
};
use sensorvault_storage::{ObjectMeta, ObjectSink, OpenDalSink, StorageError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub const CONTAINER: &str = "sensor-archive";
pub const CATEGORY: &str = "hourly";
pub const MEASUREMENT: &str = "sensors";

pub fn hour(year: i32, month: u32, day: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, h, 0, 0).unwrap()
}

pub fn first_hour_2024() -> TimeWindow {
    let start = hour(2024, 1, 1, 0);
    TimeWindow::new(start, start + Duration::hours(1)).unwrap()
}

pub fn reading(sensor: &str, ts: DateTime<Utc>, t: f64, h: f64, cpu: f64) -> SensorRecord {
    SensorRecord {
        sensor_id: Some(sensor.to_string()),
        timestamp: ts,
        temperature: Some(t),
        humidity: Some(h),
        cpu: Some(cpu),
    }
}

/// Memory source pre-loaded with one reading from each of three sensors
pub fn three_sensor_source() -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::new());
    let start = hour(2024, 1, 1, 0);
    for (i, sensor) in ["sensor-1", "sensor-2", "sensor-3"].iter().enumerate() {
        let ts = start + Duration::minutes(10 * (i as i64 + 1));
        source.insert_record(MEASUREMENT, &reading(sensor, ts, 20.0 + i as f64, 40.0, 5.5));
    }
    source
}

pub fn job(source: Arc<dyn RecordSource>, sink: Arc<dyn ObjectSink>) -> ArchiveJob {
    ArchiveJob::new(Extractor::new(source, MEASUREMENT), sink, CONTAINER, CATEGORY)
}

pub fn options(interval_secs: u64, cooldown_secs: u64) -> ServiceOptions {
    ServiceOptions {
        interval: std::time::Duration::from_secs(interval_secs),
        cooldown: std::time::Duration::from_secs(cooldown_secs),
        stop_timeout: std::time::Duration::from_secs(1),
        status_timeout: std::time::Duration::from_secs(1),
        recent_files_limit: 2,
    }
}

pub fn service(
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn ObjectSink>,
    options: ServiceOptions,
) -> ArchiveService {
    ArchiveService::new(job(source, sink).with_retry(RetryPolicy::none()), options)
}

pub fn memory_sink() -> Arc<OpenDalSink> {
    Arc::new(OpenDalSink::memory().unwrap())
}

/// Source that is never reachable
pub struct DownSource;

#[async_trait]
impl RecordSource for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    async fn health(&self) -> Result<(), SourceError> {
        Err(SourceError::unavailable("connection refused"))
    }

    async fn query(&self, _query: &RangeQuery) -> Result<Vec<SourceRow>, SourceError> {
        Err(SourceError::unavailable("connection refused"))
    }
}

/// Source whose query panics
pub struct PanickingSource;

#[async_trait]
impl RecordSource for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn health(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn query(&self, _query: &RangeQuery) -> Result<Vec<SourceRow>, SourceError> {
        panic!("source exploded");
    }
}

/// Source that blocks every query until released, announcing each entry
pub struct GatedSource {
    inner: MemorySource,
    pub entered: Notify,
    gate: Semaphore,
    pub queries: AtomicUsize,
}

impl GatedSource {
    pub fn new() -> Self {
        Self {
            inner: MemorySource::new(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn release(&self, queries: usize) {
        self.gate.add_permits(queries);
    }
}

#[async_trait]
impl RecordSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    async fn health(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn query(&self, query: &RangeQuery) -> Result<Vec<SourceRow>, SourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| SourceError::unavailable("gate closed"))?;
        permit.forget();
        self.inner.query(query).await
    }
}

/// Sink wrapper with injectable failures
pub struct FaultySink {
    pub inner: OpenDalSink,
    /// Puts for names ending in one of these suffixes always fail
    pub reject_suffixes: Vec<&'static str>,
    /// Number of upcoming puts that fail with a temporary error
    pub transient_failures: AtomicUsize,
    pub unreachable: bool,
    pub puts: Mutex<Vec<String>>,
}

impl FaultySink {
    pub fn new() -> Self {
        Self {
            inner: OpenDalSink::memory().unwrap(),
            reject_suffixes: Vec::new(),
            transient_failures: AtomicUsize::new(0),
            unreachable: false,
            puts: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(suffixes: &[&'static str]) -> Self {
        Self {
            reject_suffixes: suffixes.to_vec(),
            ..Self::new()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }

    fn check_reachable(&self, container: &str) -> Result<(), StorageError> {
        if self.unreachable {
            return Err(StorageError::Unavailable {
                container: container.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectSink for FaultySink {
    fn backend(&self) -> &str {
        "faulty"
    }

    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        self.check_reachable(container)?;
        self.inner.ensure_container(container).await
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.check_reachable(container)?;
        self.puts.lock().push(name.to_string());

        if self.reject_suffixes.iter().any(|s| name.ends_with(s)) {
            return Err(StorageError::PutFailed {
                name: name.to_string(),
                reason: "403 Forbidden".to_string(),
                temporary: false,
            });
        }

        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(StorageError::PutFailed {
                name: name.to_string(),
                reason: "503 Slow Down".to_string(),
                temporary: true,
            });
        }

        self.inner.put(container, name, bytes, content_type).await
    }

    async fn get(&self, container: &str, name: &str) -> Result<Bytes, StorageError> {
        self.check_reachable(container)?;
        self.inner.get(container, name).await
    }

    async fn list(
        &self,
        container: &str,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ObjectMeta>, StorageError> {
        self.check_reachable(container)?;
        self.inner.list(container, prefix, limit).await
    }

    async fn delete(&self, container: &str, name: &str) -> Result<(), StorageError> {
        self.check_reachable(container)?;
        self.inner.delete(container, name).await
    }
}

/// Poll `condition` every 10ms, giving up after ten seconds of (possibly paused) time
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
