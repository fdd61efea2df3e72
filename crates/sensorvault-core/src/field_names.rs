//! Column names shared by every archive format and by the source extractor.

pub const SENSOR_ID: &str = "sensor_id";
pub const TIMESTAMP: &str = "timestamp";
pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const CPU: &str = "cpu";

/// Fixed column order used by JSON objects, the CSV header and the Parquet schema.
pub const COLUMNS: [&str; 5] = [SENSOR_ID, TIMESTAMP, TEMPERATURE, HUMIDITY, CPU];
