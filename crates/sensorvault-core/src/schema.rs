// Arrow schema for archived sensor records
//
// Column order matches the JSON and CSV layouts. Timestamps keep the source's
// nanosecond precision; metrics are nullable so absent readings survive as
// Parquet nulls.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use std::sync::{Arc, OnceLock};

use crate::field_names;

/// Returns a cached `Arc<Schema>` for sensor records.
pub fn sensor_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(|| Arc::new(build_schema())))
}

fn build_schema() -> Schema {
    Schema::new(vec![
        Field::new(field_names::SENSOR_ID, DataType::Utf8, true),
        Field::new(
            field_names::TIMESTAMP,
            DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
            false,
        ),
        Field::new(field_names::TEMPERATURE, DataType::Float64, true),
        Field::new(field_names::HUMIDITY, DataType::Float64, true),
        Field::new(field_names::CPU, DataType::Float64, true),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_column_order() {
        let schema = sensor_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, field_names::COLUMNS);
        assert!(!schema.field(1).is_nullable());
    }
}
