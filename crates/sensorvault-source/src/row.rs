use chrono::{DateTime, Utc};

/// One row as returned by a source, before pivoting.
///
/// A row may carry a single field (InfluxDB's one-row-per-field shape) or
/// several (an already pivoted table). Values the source sent but that could
/// not be read as numbers are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub sensor_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<(String, Option<f64>)>,
}

impl SourceRow {
    pub fn new(sensor_id: Option<&str>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.map(str::to_string),
            timestamp,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}
