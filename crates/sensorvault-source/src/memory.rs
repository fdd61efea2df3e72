//! In-process source, for deployments without a time-series database and for tests

use async_trait::async_trait;
use parking_lot::RwLock;
use sensorvault_core::{Metric, SensorRecord};

use crate::error::Result;
use crate::query::RangeQuery;
use crate::row::SourceRow;
use crate::source::RecordSource;

#[derive(Default)]
pub struct MemorySource {
    rows: RwLock<Vec<(String, SourceRow)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, measurement: &str, row: SourceRow) {
        self.rows.write().push((measurement.to_string(), row));
    }

    /// Store a full record as one row per present metric, the way InfluxDB returns it.
    ///
    /// A record with no metrics is kept as a single field-less row.
    pub fn insert_record(&self, measurement: &str, record: &SensorRecord) {
        let mut rows = self.rows.write();
        let before = rows.len();
        for metric in Metric::ALL {
            if let Some(value) = record.metric(metric) {
                let row = SourceRow::new(record.sensor_id.as_deref(), record.timestamp)
                    .with_field(metric.as_str(), Some(value));
                rows.push((measurement.to_string(), row));
            }
        }
        if rows.len() == before {
            let row = SourceRow::new(record.sensor_id.as_deref(), record.timestamp);
            rows.push((measurement.to_string(), row));
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn clear(&self) {
        self.rows.write().clear();
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }

    async fn query(&self, query: &RangeQuery) -> Result<Vec<SourceRow>> {
        let rows = self.rows.read();
        Ok(rows
            .iter()
            .filter(|(measurement, row)| {
                *measurement == query.measurement && query.window.contains(row.timestamp)
            })
            .map(|(_, row)| row.clone())
            .collect())
    }
}
