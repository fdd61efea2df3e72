//! Errors returned to callers of the archive service

use sensorvault_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("archive service is already running")]
    AlreadyRunning,

    /// Another archive job holds the job lock
    #[error("an archive job is already in progress")]
    JobInProgress,

    #[error("hours_back must be between 1 and {max}, got {hours_back}")]
    InvalidHoursBack { hours_back: i64, max: i64 },

    #[error("storage sink unavailable: {0}")]
    StorageUnavailable(#[source] StorageError),
}

impl ServiceError {
    /// Stable taxonomy name used in HTTP responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "AlreadyRunning",
            Self::JobInProgress => "JobInProgress",
            Self::InvalidHoursBack { .. } => "InvalidHoursBack",
            Self::StorageUnavailable(_) => "StorageUnavailable",
        }
    }
}
