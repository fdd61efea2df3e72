// sensorvault-pipeline - Archive job, scheduler and status reporting
//
// `ArchiveJob` runs one extract -> serialize -> upload cycle for a window.
// `ArchiveService` drives jobs at a fixed cadence on a background task,
// serializes them behind a single job lock, and reports status snapshots.
// The service is transport-agnostic; the server crate exposes it over HTTP.

mod error;
mod job;
mod scheduler;
mod state;
mod status;

pub use error::ServiceError;
pub use job::{
    ArchiveJob, ArchiveJobResult, FailureStage, FormatOutcome, FormatStatus, JobError, JobState,
    RetryPolicy,
};
pub use scheduler::{ArchiveService, Clock, ServiceOptions, MAX_HOURS_BACK};
pub use state::{CycleReport, ServiceState, Trigger};
pub use status::ArchiveStatus;
