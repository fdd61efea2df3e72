// Archive job: one extract -> serialize -> upload cycle for a window
//
// PENDING -> EXTRACTING -> SERIALIZING -> UPLOADING -> DONE | FAILED
//
// Formats are isolated from each other. A serializer or upload failure is
// recorded against its format and the remaining formats are still attempted.
// The job is DONE when at least one format reached the sink.

use metrics::{counter, histogram};
use sensorvault_config::ArchiveConfig;
use sensorvault_core::{ArchiveFormat, ArchivePayload, SensorBatch, TimeWindow};
use sensorvault_source::{Extractor, SourceError};
use sensorvault_storage::{ObjectSink, StorageError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Extracting,
    Serializing,
    Uploading,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Serialize,
    Upload,
}

/// Typed error carried in job results and status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobError {
    pub error_type: &'static str,
    pub message: String,
}

impl JobError {
    pub fn new(error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }
}

impl From<&SourceError> for JobError {
    fn from(err: &SourceError) -> Self {
        Self::new(err.error_type(), err.to_string())
    }
}

impl From<&StorageError> for JobError {
    fn from(err: &StorageError) -> Self {
        Self::new(err.error_type(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FormatStatus {
    Written {
        object_name: String,
        bytes: usize,
        content_hash: String,
        attempts: u32,
    },
    Failed {
        stage: FailureStage,
        #[serde(flatten)]
        error: JobError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatOutcome {
    pub format: ArchiveFormat,
    #[serde(flatten)]
    pub status: FormatStatus,
}

impl FormatOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, FormatStatus::Written { .. })
    }
}

/// Outcome of one archive job. Produced per cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveJobResult {
    pub window: TimeWindow,
    pub state: JobState,
    pub record_count: usize,
    pub payloads_written: usize,
    pub formats: Vec<FormatOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl ArchiveJobResult {
    fn failed(window: TimeWindow, error: JobError) -> Self {
        Self {
            window,
            state: JobState::Failed,
            record_count: 0,
            payloads_written: 0,
            formats: Vec::new(),
            error: Some(error),
        }
    }

    /// Result for a job that never returned (panicked or was cancelled).
    pub fn aborted(window: TimeWindow, message: impl Into<String>) -> Self {
        Self::failed(window, JobError::new("JobAborted", message))
    }

    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }

    pub fn is_aborted(&self) -> bool {
        matches!(&self.error, Some(e) if e.error_type == "JobAborted")
    }

    pub fn outcome(&self, format: ArchiveFormat) -> Option<&FormatOutcome> {
        self.formats.iter().find(|o| o.format == format)
    }
}

/// Upload attempts per format, with exponential backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1` (attempts are 1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&ArchiveConfig> for RetryPolicy {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            max_attempts: config.upload_attempts.max(1),
            initial_backoff: config.upload_backoff(),
        }
    }
}

#[derive(Clone)]
pub struct ArchiveJob {
    extractor: Extractor,
    sink: Arc<dyn ObjectSink>,
    container: String,
    category: String,
    retry: RetryPolicy,
}

impl ArchiveJob {
    pub fn new(
        extractor: Extractor,
        sink: Arc<dyn ObjectSink>,
        container: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            sink,
            container: container.into(),
            category: category.into(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn sink(&self) -> &Arc<dyn ObjectSink> {
        &self.sink
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Run one cycle for `window`. Never returns an error: every failure is
    /// captured in the result.
    pub async fn run(&self, window: TimeWindow) -> ArchiveJobResult {
        let started = Instant::now();
        transition(window, JobState::Pending);

        transition(window, JobState::Extracting);
        let batch = match self.extractor.extract(window).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(%window, error = %e, "Extraction failed; no payloads attempted");
                transition(window, JobState::Failed);
                return ArchiveJobResult::failed(window, JobError::from(&e));
            }
        };
        let record_count = batch.len();
        counter!("sensorvault.records", record_count as u64);

        transition(window, JobState::Serializing);
        let (payloads, mut formats) = self.serialize_all(&batch);

        transition(window, JobState::Uploading);
        for payload in payloads {
            formats.push(self.upload(payload).await);
        }
        formats.sort_by_key(|o| o.format);

        let payloads_written = formats.iter().filter(|o| o.is_written()).count();
        let (state, error) = if payloads_written > 0 {
            (JobState::Done, None)
        } else {
            (JobState::Failed, Some(all_formats_failed(&formats)))
        };
        transition(window, state);
        histogram!("sensorvault.job.duration_ms", started.elapsed().as_secs_f64() * 1000.0);

        info!(
            %window,
            state = ?state,
            records = record_count,
            payloads_written,
            formats = formats.len(),
            "Archive job finished"
        );

        ArchiveJobResult {
            window,
            state,
            record_count,
            payloads_written,
            formats,
            error,
        }
    }

    fn serialize_all(&self, batch: &SensorBatch) -> (Vec<ArchivePayload>, Vec<FormatOutcome>) {
        let mut payloads = Vec::with_capacity(ArchiveFormat::ALL.len());
        let mut failures = Vec::new();

        for format in ArchiveFormat::ALL {
            match ArchivePayload::build(&self.category, format, batch) {
                Ok(payload) => payloads.push(payload),
                Err(e) => {
                    warn!(%format, error = %e, "Serialization failed");
                    counter!("sensorvault.payloads.failed", 1, "stage" => "serialize");
                    failures.push(FormatOutcome {
                        format,
                        status: FormatStatus::Failed {
                            stage: FailureStage::Serialize,
                            error: JobError::new(e.error_type(), e.to_string()),
                        },
                    });
                }
            }
        }

        (payloads, failures)
    }

    async fn upload(&self, payload: ArchivePayload) -> FormatOutcome {
        let format = payload.format;
        let mut attempt = 1;

        loop {
            match self.put_once(&payload).await {
                Ok(()) => {
                    counter!("sensorvault.payloads.written", 1);
                    debug!(
                        object = %payload.object_name,
                        bytes = payload.len(),
                        hash = %payload.content_hash,
                        attempt,
                        "Payload uploaded"
                    );
                    return FormatOutcome {
                        format,
                        status: FormatStatus::Written {
                            object_name: payload.object_name,
                            bytes: payload.bytes.len(),
                            content_hash: payload.content_hash.to_hex(),
                            attempts: attempt,
                        },
                    };
                }
                Err(e) if attempt < self.retry.max_attempts && e.is_retryable() => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        object = %payload.object_name,
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Upload failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(object = %payload.object_name, error = %e, attempt, "Upload failed");
                    counter!("sensorvault.payloads.failed", 1, "stage" => "upload");
                    return FormatOutcome {
                        format,
                        status: FormatStatus::Failed {
                            stage: FailureStage::Upload,
                            error: JobError::from(&e),
                        },
                    };
                }
            }
        }
    }

    async fn put_once(&self, payload: &ArchivePayload) -> Result<(), StorageError> {
        self.sink.ensure_container(&self.container).await?;
        self.sink
            .put(
                &self.container,
                &payload.object_name,
                payload.bytes.clone(),
                payload.content_type(),
            )
            .await
    }
}

fn transition(window: TimeWindow, state: JobState) {
    debug!(%window, state = ?state, "Archive job state");
}

fn all_formats_failed(formats: &[FormatOutcome]) -> JobError {
    let first = formats.iter().find_map(|o| match &o.status {
        FormatStatus::Failed { error, .. } => Some(error.clone()),
        FormatStatus::Written { .. } => None,
    });

    match first {
        Some(first) => JobError::new(
            first.error_type,
            format!("all {} formats failed; first error: {}", formats.len(), first.message),
        ),
        None => JobError::new("NoFormats", "no formats were attempted"),
    }
}
