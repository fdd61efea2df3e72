use chrono::{DateTime, Utc};
use sensorvault_core::{Metric, SensorBatch, SensorRecord, TimeWindow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::query::RangeQuery;
use crate::row::SourceRow;
use crate::source::RecordSource;

/// Pulls one window of records from a [`RecordSource`] and normalizes them
/// into [`SensorRecord`]s.
#[derive(Clone)]
pub struct Extractor {
    source: Arc<dyn RecordSource>,
    measurement: String,
}

impl Extractor {
    pub fn new(source: Arc<dyn RecordSource>, measurement: impl Into<String>) -> Self {
        Self {
            source,
            measurement: measurement.into(),
        }
    }

    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Issue one bounded query for `window`. An empty window is an empty batch.
    pub async fn extract(&self, window: TimeWindow) -> Result<SensorBatch> {
        let query = RangeQuery::new(self.measurement.as_str(), window);
        let rows = self.source.query(&query).await?;
        let row_count = rows.len();

        let records = pivot_rows(rows);
        debug!(
            source = self.source.name(),
            %window,
            rows = row_count,
            records = records.len(),
            "Extracted window"
        );
        Ok(SensorBatch::new(window, records))
    }
}

/// Merge rows sharing `(sensor_id, timestamp)` into one record.
///
/// Records keep the order in which their key was first seen. A later
/// non-null value for a metric replaces an earlier one; a null never erases
/// a value. Metrics no row reported stay absent.
pub fn pivot_rows(rows: Vec<SourceRow>) -> Vec<SensorRecord> {
    let mut index: HashMap<(Option<String>, DateTime<Utc>), usize> = HashMap::new();
    let mut records: Vec<SensorRecord> = Vec::new();

    for row in rows {
        let key = (row.sensor_id, row.timestamp);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                records.push(SensorRecord::empty(key.0.clone(), key.1));
                index.insert(key, records.len() - 1);
                records.len() - 1
            }
        };

        let record = &mut records[slot];
        for (field, value) in row.fields {
            match Metric::from_field(&field) {
                Some(metric) if value.is_some() => record.set_metric(metric, value),
                Some(_) => {}
                None => trace!(field = %field, "Ignoring non-metric field"),
            }
        }
    }

    records
}
