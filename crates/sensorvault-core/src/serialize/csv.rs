//! CSV serializer: RFC 4180 layout with a fixed header row.

use ::csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::SerializationError;
use crate::field_names::COLUMNS;
use crate::payload::ArchiveFormat;
use crate::types::{format_timestamp, SensorBatch};

/// Render a batch as CSV.
///
/// The header row is always written, so an empty batch still produces a
/// non-empty, byte-stable object. Absent values are empty cells; fields that
/// contain the delimiter, quotes or line breaks are quoted. An empty sensor id
/// is written as `""` so it stays distinguishable from an absent one.
pub fn serialize_csv(batch: &SensorBatch) -> Result<Vec<u8>, SerializationError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Csv, e))?;

    for record in batch.records() {
        let row = [
            record.sensor_id.clone().unwrap_or_default(),
            format_timestamp(record.timestamp),
            format_metric(record.temperature),
            format_metric(record.humidity),
            format_metric(record.cpu),
        ];

        let written = if record.sensor_id.as_deref() == Some("") {
            // QuoteStyle::Necessary leaves an empty field unquoted
            writer.flush().map_err(|e| SerializationError::encoding(ArchiveFormat::Csv, e))?;
            writer.get_mut().extend_from_slice(b"\"\",");
            writer.write_record(&row[1..])
        } else {
            writer.write_record(&row)
        };
        written.map_err(|e| SerializationError::encoding(ArchiveFormat::Csv, e))?;
    }

    writer
        .into_inner()
        .map_err(|e| SerializationError::encoding(ArchiveFormat::Csv, e.error()))
}

fn format_metric(value: Option<f64>) -> String {
    // f64 Display is the shortest representation that parses back exactly
    value.map(|v| v.to_string()).unwrap_or_default()
}
