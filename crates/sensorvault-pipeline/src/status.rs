use sensorvault_storage::ObjectMeta;
use serde::Serialize;

use crate::job::JobError;
use crate::state::CycleReport;

/// Read-only snapshot returned by [`ArchiveService::get_status`](crate::ArchiveService::get_status).
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub container: String,
    pub category: String,
    pub sink_backend: String,
    pub sink_connected: bool,
    pub source_backend: String,
    pub source_connected: bool,
    /// Newest archives first
    pub recent_files: Vec<ObjectMeta>,
    /// Objects under the category prefix; absent when the sink could not be listed
    pub total_file_count: Option<usize>,
    pub cumulative_file_count: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub last_cycle: Option<CycleReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}
