//! Archive formats and serialized payloads

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SerializationError;
use crate::naming::object_name;
use crate::serialize;
use crate::types::SensorBatch;

/// Durable formats every window is archived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Json,
    Csv,
    Parquet,
}

impl ArchiveFormat {
    /// All formats, in the order a cycle attempts them.
    pub const ALL: [ArchiveFormat; 3] = [
        ArchiveFormat::Json,
        ArchiveFormat::Csv,
        ArchiveFormat::Parquet,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Json => "json",
            ArchiveFormat::Csv => "csv",
            ArchiveFormat::Parquet => "parquet",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(ArchiveFormat::Json),
            "csv" => Some(ArchiveFormat::Csv),
            "parquet" => Some(ArchiveFormat::Parquet),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArchiveFormat::Json => "application/json",
            ArchiveFormat::Csv => "text/csv",
            ArchiveFormat::Parquet => "application/octet-stream",
        }
    }

    /// Render a batch in this format. Pure and deterministic.
    pub fn serialize(&self, batch: &SensorBatch) -> Result<Vec<u8>, SerializationError> {
        match self {
            ArchiveFormat::Json => serialize::json::serialize_json(batch),
            ArchiveFormat::Csv => serialize::csv::serialize_csv(batch),
            ArchiveFormat::Parquet => serialize::parquet::serialize_parquet(batch),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(&s.to_lowercase()).ok_or_else(|| {
            format!(
                "Unsupported archive format: {}. Supported: json, csv, parquet",
                s
            )
        })
    }
}

/// BLAKE3 hash of a payload's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One serialized format of one window, ready to upload
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivePayload {
    pub format: ArchiveFormat,
    pub object_name: String,
    pub bytes: Bytes,
    pub content_hash: ContentHash,
}

impl ArchivePayload {
    /// Serialize `batch` and name the result after the batch window start.
    pub fn build(
        category: &str,
        format: ArchiveFormat,
        batch: &SensorBatch,
    ) -> Result<Self, SerializationError> {
        let bytes = format.serialize(batch)?;
        let content_hash = ContentHash::of(&bytes);
        Ok(Self {
            format,
            object_name: object_name(category, format, batch.window().start()),
            bytes: Bytes::from(bytes),
            content_hash,
        })
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SensorRecord, TimeWindow};
    use chrono::{TimeZone, Utc};

    fn batch() -> SensorBatch {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let window = TimeWindow::new(start, end).unwrap();
        let mut record = SensorRecord::empty(Some("sensor-1".into()), start);
        record.temperature = Some(21.5);
        SensorBatch::new(window, vec![record])
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Json);
        assert_eq!("CSV".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Csv);
        assert_eq!(
            "parquet".parse::<ArchiveFormat>().unwrap(),
            ArchiveFormat::Parquet
        );
        assert!("avro".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn test_payload_is_named_after_window_start() {
        for format in ArchiveFormat::ALL {
            let payload = ArchivePayload::build("hourly", format, &batch()).unwrap();
            assert_eq!(
                payload.object_name,
                format!("hourly/20240101_000000.{}", format.extension())
            );
            assert!(!payload.is_empty());
            assert_eq!(payload.content_hash, ContentHash::of(&payload.bytes));
        }
    }

    #[test]
    fn test_payload_build_is_deterministic() {
        for format in ArchiveFormat::ALL {
            let a = ArchivePayload::build("hourly", format, &batch()).unwrap();
            let b = ArchivePayload::build("hourly", format, &batch()).unwrap();
            assert_eq!(a, b, "{} payload differs between runs", format);
        }
    }
}
