//! JSON serializer: a pretty-printed array of record objects.

use serde::Serialize;

use crate::error::SerializationError;
use crate::payload::ArchiveFormat;
use crate::types::{format_timestamp, Metric, SensorBatch};

/// Wire shape of one record. Field order is the archive column order.
#[derive(Serialize)]
struct JsonRecord<'a> {
    sensor_id: Option<&'a str>,
    timestamp: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    cpu: Option<f64>,
}

/// Render a batch as a JSON array. Empty batches render as `[]`.
///
/// Non-finite metrics are rejected: serde_json would otherwise write them as
/// `null`, which is indistinguishable from an absent reading.
pub fn serialize_json(batch: &SensorBatch) -> Result<Vec<u8>, SerializationError> {
    let mut records = Vec::with_capacity(batch.len());

    for (index, record) in batch.records().iter().enumerate() {
        for metric in Metric::ALL {
            if matches!(record.metric(metric), Some(v) if !v.is_finite()) {
                return Err(SerializationError::NonFiniteValue {
                    format: ArchiveFormat::Json,
                    field: metric.as_str(),
                    index,
                });
            }
        }

        records.push(JsonRecord {
            sensor_id: record.sensor_id.as_deref(),
            timestamp: format_timestamp(record.timestamp),
            temperature: record.temperature,
            humidity: record.humidity,
            cpu: record.cpu,
        });
    }

    serde_json::to_vec_pretty(&records)
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Json, e))
}
