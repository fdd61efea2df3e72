// Archive service: scheduling loop, manual trigger and status
//
// One background task runs the periodic loop. Every archive job, scheduled
// or manual, runs while holding the job lock, so at most one job is in
// flight. Scheduled cycles wait for the lock; manual triggers that find it
// taken fail fast with `JobInProgress`.
//
// Each job runs on its own task. A panic inside a job becomes an aborted
// cycle result and the loop backs off for the cool-down period.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use metrics::counter;
use parking_lot::Mutex;
use sensorvault_config::{ArchiveConfig, RuntimeConfig};
use sensorvault_core::TimeWindow;
use sensorvault_source::{Extractor, RecordSource};
use sensorvault_storage::ObjectSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ServiceError;
use crate::job::{ArchiveJob, ArchiveJobResult, JobError, RetryPolicy};
use crate::state::{CycleReport, ServiceState, Trigger};
use crate::status::ArchiveStatus;

/// Upper bound for `manual_trigger(hours_back)`: ten years
pub const MAX_HOURS_BACK: i64 = 24 * 366 * 10;

/// Wall-clock source, replaceable in tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub interval: Duration,
    pub cooldown: Duration,
    pub stop_timeout: Duration,
    pub status_timeout: Duration,
    pub recent_files_limit: usize,
}

impl From<&ArchiveConfig> for ServiceOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            interval: config.interval(),
            cooldown: config.cooldown(),
            stop_timeout: config.stop_timeout(),
            status_timeout: config.status_timeout(),
            recent_files_limit: config.recent_files_limit,
        }
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from(&ArchiveConfig::default())
    }
}

struct Shared {
    job: ArchiveJob,
    options: ServiceOptions,
    job_lock: Arc<tokio::sync::Mutex<()>>,
    state: Arc<Mutex<ServiceState>>,
    clock: Clock,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Clears the running flag however the loop task ends
struct RunningGuard(Arc<Mutex<ServiceState>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.lock().running = false;
    }
}

/// The archiving service. Construct once and share by reference or `Arc`.
pub struct ArchiveService {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl ArchiveService {
    pub fn new(job: ArchiveJob, options: ServiceOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                options,
                job_lock: Arc::new(tokio::sync::Mutex::new(())),
                state: Arc::new(Mutex::new(ServiceState::default())),
                clock: Arc::new(Utc::now),
            }),
            worker: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Wire a service from configuration and already-built collaborators.
    pub fn from_config(
        config: &RuntimeConfig,
        sink: Arc<dyn ObjectSink>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        let extractor = Extractor::new(source, config.source.measurement.as_str());
        let job = ArchiveJob::new(
            extractor,
            sink,
            config.archive.container.as_str(),
            config.archive.category.as_str(),
        )
        .with_retry(RetryPolicy::from(&config.archive));
        Self::new(job, ServiceOptions::from(&config.archive))
    }

    /// Replace the wall clock used to compute windows. Must be called before `start`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.clock = clock;
        }
        self
    }

    pub fn job(&self) -> &ArchiveJob {
        &self.shared.job
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.shared.options
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Copy of the current service state
    pub fn state(&self) -> ServiceState {
        self.shared.state.lock().clone()
    }

    /// Verify the sink and start the periodic loop. Returns once the loop is spawned.
    pub async fn start(&self) -> Result<(), ServiceError> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running() {
            return Err(ServiceError::AlreadyRunning);
        }

        let job = &self.shared.job;
        job.sink()
            .ensure_container(job.container())
            .await
            .map_err(|e| {
                error!(container = job.container(), error = %e, "Sink unreachable; not starting");
                ServiceError::StorageUnavailable(e)
            })?;

        *self.shared.state.lock() = ServiceState::started();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared), cancel.clone()));
        *self.worker.lock() = Some(Worker { cancel, handle });

        info!(
            interval_secs = self.shared.options.interval.as_secs(),
            container = job.container(),
            category = job.category(),
            "Archive service started"
        );
        Ok(())
    }

    /// Request the loop to stop and wait up to the stop timeout for it to exit.
    ///
    /// A job that is already running is never interrupted; if it outlives the
    /// timeout this returns `false` and `is_running` stays true until it ends.
    /// The loop handle is kept in that case, so a later `stop` waits again.
    pub async fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        let Some(mut worker) = self.worker.lock().take() else {
            return !self.is_running();
        };

        worker.cancel.cancel();
        match tokio::time::timeout(self.shared.options.stop_timeout, &mut worker.handle).await {
            Ok(_) => {
                info!("Archive service stopped");
                true
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.shared.options.stop_timeout.as_secs(),
                    "Archive loop still finishing a job after stop timeout"
                );
                *self.worker.lock() = Some(worker);
                false
            }
        }
    }

    /// Archive `[now - hours_back, now)` right away, outside the cadence.
    ///
    /// Rejected with `JobInProgress` while any other job holds the job lock.
    pub async fn manual_trigger(&self, hours_back: i64) -> Result<ArchiveJobResult, ServiceError> {
        if !(1..=MAX_HOURS_BACK).contains(&hours_back) {
            return Err(ServiceError::InvalidHoursBack {
                hours_back,
                max: MAX_HOURS_BACK,
            });
        }

        let permit = Arc::clone(&self.shared.job_lock)
            .try_lock_owned()
            .map_err(|_| ServiceError::JobInProgress)?;

        let window = trailing_window(&self.shared, TimeDelta::hours(hours_back)).map_err(|_| {
            ServiceError::InvalidHoursBack {
                hours_back,
                max: MAX_HOURS_BACK,
            }
        })?;

        info!(%window, hours_back, "Manual archive triggered");
        Ok(execute(&self.shared, Trigger::Manual, window, permit).await)
    }

    /// Snapshot of service health. Never waits for an in-flight job.
    pub async fn get_status(&self) -> ArchiveStatus {
        let snapshot = self.state();
        let job = &self.shared.job;
        let options = &self.shared.options;
        let source = job.extractor().source();
        let prefix = format!("{}/", job.category());

        let listing = tokio::time::timeout(
            options.status_timeout,
            job.sink().list(job.container(), Some(prefix.as_str()), None),
        );
        let probe = async {
            source.is_configured()
                && matches!(
                    tokio::time::timeout(options.status_timeout, source.health()).await,
                    Ok(Ok(()))
                )
        };
        let (listing, source_connected) = tokio::join!(listing, probe);

        let (sink_connected, recent_files, total_file_count, error) = match listing {
            Ok(Ok(mut objects)) => {
                let total = objects.len();
                objects.reverse();
                objects.truncate(options.recent_files_limit);
                (true, objects, Some(total), None)
            }
            Ok(Err(e)) => (false, Vec::new(), None, Some(JobError::from(&e))),
            Err(_) => (
                false,
                Vec::new(),
                None,
                Some(JobError::new(
                    "StorageUnavailable",
                    format!(
                        "listing timed out after {}s",
                        options.status_timeout.as_secs()
                    ),
                )),
            ),
        };

        ArchiveStatus {
            running: snapshot.running,
            interval_secs: options.interval.as_secs(),
            container: job.container().to_string(),
            category: job.category().to_string(),
            sink_backend: job.sink().backend().to_string(),
            sink_connected,
            source_backend: source.name().to_string(),
            source_connected,
            recent_files,
            total_file_count,
            cumulative_file_count: snapshot.cumulative_file_count,
            cycles_completed: snapshot.cycles_completed,
            cycles_failed: snapshot.cycles_failed,
            last_cycle: snapshot.last_cycle,
            error,
        }
    }
}

/// `[now - span, now)` with `now` truncated to whole seconds.
fn trailing_window(
    shared: &Shared,
    span: TimeDelta,
) -> Result<TimeWindow, sensorvault_core::WindowError> {
    let now = (shared.clock)();
    let now = now.duration_trunc(TimeDelta::seconds(1)).unwrap_or(now);
    TimeWindow::trailing(now, span)
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "archive job was cancelled".to_string();
    }
    let panic = err.into_panic();
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("archive job panicked: {message}")
}

/// Run one job on its own task while holding `permit`, then record it.
///
/// Recording happens on the spawned task before the permit is released, so
/// the cycle is accounted for even if the caller stops waiting.
async fn execute(
    shared: &Shared,
    trigger: Trigger,
    window: TimeWindow,
    permit: OwnedMutexGuard<()>,
) -> ArchiveJobResult {
    let job = shared.job.clone();
    let state = Arc::clone(&shared.state);

    let handle = tokio::spawn(async move {
        let _permit = permit;
        let started_at = Utc::now();

        let result = match tokio::spawn(async move { job.run(window).await }).await {
            Ok(result) => result,
            Err(e) => {
                let message = describe_join_error(e);
                error!(%window, ?trigger, error = %message, "Archive job aborted");
                ArchiveJobResult::aborted(window, message)
            }
        };

        counter!("sensorvault.cycles", 1);
        if !result.is_done() {
            counter!("sensorvault.cycles.failed", 1);
        }

        state.lock().record(CycleReport {
            trigger,
            started_at,
            finished_at: Utc::now(),
            result: result.clone(),
        });
        result
    });

    match handle.await {
        Ok(result) => result,
        Err(e) => ArchiveJobResult::aborted(window, describe_join_error(e)),
    }
}

async fn run_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let _running = RunningGuard(Arc::clone(&shared.state));
    let interval = shared.options.interval;
    let mut delay = interval;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&shared.job_lock).lock_owned() => permit,
        };

        let window = TimeDelta::from_std(interval)
            .ok()
            .and_then(|span| trailing_window(&shared, span).ok());
        let window = match window {
            Some(window) => window,
            None => {
                error!(
                    interval_secs = interval.as_secs(),
                    "Cannot compute archive window; cooling down"
                );
                drop(permit);
                delay = shared.options.cooldown;
                continue;
            }
        };

        let result = execute(&shared, Trigger::Scheduled, window, permit).await;
        delay = if result.is_aborted() {
            warn!(
                cooldown_secs = shared.options.cooldown.as_secs(),
                "Cycle aborted; cooling down before next attempt"
            );
            shared.options.cooldown
        } else {
            interval
        };
    }

    info!("Archive loop exited");
}
