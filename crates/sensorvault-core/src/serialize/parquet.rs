// Parquet serializer with size-optimized configuration
//
// Uses Snappy compression and dictionary encoding. One column per record
// field, nulls preserved exactly as present in the batch.

use ::parquet::arrow::ArrowWriter;
use ::parquet::basic::Compression;
use ::parquet::file::properties::{EnabledStatistics, WriterProperties};
use ::parquet::format::KeyValue;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, TimestampNanosecondArray};
use std::sync::{Arc, OnceLock};

use crate::error::SerializationError;
use crate::payload::ArchiveFormat;
use crate::schema::sensor_schema;
use crate::types::{Metric, SensorBatch};

const ROW_GROUP_SIZE: usize = 32 * 1024;

/// Get shared writer properties (cached)
///
/// - Snappy compression
/// - Dictionary encoding enabled (sensor ids repeat heavily)
/// - 32k rows per group
/// - Archive layout version embedded in the file metadata
pub fn writer_properties() -> &'static WriterProperties {
    static PROPERTIES: OnceLock<WriterProperties> = OnceLock::new();
    PROPERTIES.get_or_init(|| {
        let metadata = vec![
            KeyValue {
                key: "sensorvault.version".to_string(),
                value: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            KeyValue {
                key: "sensorvault.layout".to_string(),
                value: Some("sensor_record/v1".to_string()),
            },
        ];

        WriterProperties::builder()
            .set_dictionary_enabled(true)
            .set_statistics_enabled(EnabledStatistics::Page)
            .set_compression(Compression::SNAPPY)
            .set_data_page_size_limit(256 * 1024)
            .set_write_batch_size(ROW_GROUP_SIZE)
            .set_max_row_group_size(ROW_GROUP_SIZE)
            .set_dictionary_page_size_limit(128 * 1024)
            .set_key_value_metadata(Some(metadata))
            .build()
    })
}

/// Convert a sensor batch into an Arrow `RecordBatch` using [`sensor_schema`].
///
/// Fails if a timestamp cannot be expressed in nanoseconds since the epoch.
pub fn to_record_batch(batch: &SensorBatch) -> Result<RecordBatch, SerializationError> {
    let records = batch.records();

    let mut timestamps = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let nanos = record.timestamp.timestamp_nanos_opt().ok_or(
            SerializationError::TimestampOutOfRange {
                format: ArchiveFormat::Parquet,
                timestamp: record.timestamp,
                index,
            },
        )?;
        timestamps.push(nanos);
    }

    let sensor_ids: StringArray = records.iter().map(|r| r.sensor_id.as_deref()).collect();
    let metric_column = |metric: Metric| -> ArrayRef {
        Arc::new(
            records
                .iter()
                .map(|r| r.metric(metric))
                .collect::<Float64Array>(),
        )
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(sensor_ids),
        Arc::new(TimestampNanosecondArray::from(timestamps).with_timezone("UTC")),
        metric_column(Metric::Temperature),
        metric_column(Metric::Humidity),
        metric_column(Metric::Cpu),
    ];

    RecordBatch::try_new(sensor_schema(), columns)
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Parquet, e))
}

/// Render a batch as a Parquet file (in-memory buffer).
///
/// An empty batch yields a valid zero-row file that still carries the schema.
pub fn serialize_parquet(batch: &SensorBatch) -> Result<Vec<u8>, SerializationError> {
    let record_batch = to_record_batch(batch)?;

    let mut buffer = Vec::new();
    let props = writer_properties().clone();
    let mut writer = ArrowWriter::try_new(&mut buffer, sensor_schema(), Some(props))
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Parquet, e))?;

    if record_batch.num_rows() > 0 {
        writer
            .write(&record_batch)
            .map_err(|e| SerializationError::encoding(ArchiveFormat::Parquet, e))?;
    }
    writer
        .close()
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Parquet, e))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SensorRecord, TimeWindow};
    use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use arrow::array::Array;
    use arrow::datatypes::{DataType, TimeUnit};
    use bytes::Bytes;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TimeWindow::new(start, start + Duration::hours(1)).unwrap()
    }

    fn read_back(bytes: Vec<u8>) -> Vec<RecordBatch> {
        ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap()
            .map(|b| b.unwrap())
            .collect()
    }

    #[test]
    fn test_parquet_preserves_columns_and_nulls() {
        let start = window().start();
        let records = vec![
            SensorRecord {
                sensor_id: Some("sensor-1".into()),
                timestamp: start + Duration::seconds(10),
                temperature: Some(20.5),
                humidity: None,
                cpu: Some(3.0),
            },
            SensorRecord {
                sensor_id: None,
                timestamp: start + Duration::nanoseconds(7),
                temperature: None,
                humidity: Some(60.0),
                cpu: None,
            },
        ];
        let batch = SensorBatch::new(window(), records);

        let bytes = serialize_parquet(&batch).unwrap();
        assert_eq!(&bytes[0..4], b"PAR1");

        let batches = read_back(bytes);
        assert_eq!(batches.len(), 1);
        let read = &batches[0];
        assert_eq!(read.num_rows(), 2);

        let schema = read.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, crate::field_names::COLUMNS);
        assert_eq!(
            schema.field(1).data_type(),
            &DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into()))
        );

        let ids = read.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(ids.value(0), "sensor-1");
        assert!(ids.is_null(1));

        let ts = read
            .column(1)
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .unwrap();
        assert_eq!(
            ts.value(1),
            (start + Duration::nanoseconds(7)).timestamp_nanos_opt().unwrap()
        );

        let humidity = read.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(humidity.is_null(0));
        assert_eq!(humidity.value(1), 60.0);
        assert_eq!(humidity.null_count(), 1);
    }

    #[test]
    fn test_parquet_empty_batch_has_zero_rows() {
        let bytes = serialize_parquet(&SensorBatch::empty(window())).unwrap();
        assert_eq!(&bytes[0..4], b"PAR1");

        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes)).unwrap();
        assert_eq!(builder.metadata().file_metadata().num_rows(), 0);
        assert_eq!(builder.schema().fields().len(), 5);
    }

    #[test]
    fn test_parquet_rejects_unrepresentable_timestamp() {
        let far_future = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();
        let record = SensorRecord::empty(Some("s".into()), far_future);
        let batch = SensorBatch::new(window(), vec![record]);

        let err = serialize_parquet(&batch).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::TimestampOutOfRange { index: 0, .. }
        ));
        assert_eq!(err.format(), ArchiveFormat::Parquet);
    }

    #[test]
    fn test_parquet_is_deterministic() {
        let record = SensorRecord {
            sensor_id: Some("sensor-1".into()),
            timestamp: window().start(),
            temperature: Some(1.0),
            humidity: Some(2.0),
            cpu: Some(3.0),
        };
        let batch = SensorBatch::new(window(), vec![record; 100]);
        assert_eq!(
            serialize_parquet(&batch).unwrap(),
            serialize_parquet(&batch).unwrap()
        );
    }
}
