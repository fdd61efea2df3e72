use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::job::ArchiveJobResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

/// One finished cycle, as recorded into [`ServiceState`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: ArchiveJobResult,
}

/// Process-wide service state.
///
/// Reset when the service starts. Written only by the job execution path and
/// read as a whole snapshot by status reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceState {
    pub running: bool,
    pub last_cycle: Option<CycleReport>,
    pub cumulative_file_count: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

impl ServiceState {
    pub fn started() -> Self {
        Self {
            running: true,
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: CycleReport) {
        if report.result.is_done() {
            self.cycles_completed += 1;
        } else {
            self.cycles_failed += 1;
        }
        self.cumulative_file_count += report.result.payloads_written as u64;
        self.last_cycle = Some(report);
    }
}
