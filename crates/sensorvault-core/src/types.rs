//! Core data model: time windows, sensor records and record batches.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::WindowError;
use crate::field_names;

/// Half-open interval `[start, end)` with a non-negative duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window of length `span` ending at `end`, i.e. `[end - span, end)`.
    pub fn trailing(end: DateTime<Utc>, span: Duration) -> Result<Self, WindowError> {
        if span < Duration::zero() {
            return Err(WindowError::NegativeSpan {
                seconds: span.num_seconds(),
            });
        }
        let start = end
            .checked_sub_signed(span)
            .ok_or(WindowError::SpanOutOfRange {
                seconds: span.num_seconds(),
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Metric fields carried by every sensor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Humidity,
    Cpu,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => field_names::TEMPERATURE,
            Metric::Humidity => field_names::HUMIDITY,
            Metric::Cpu => field_names::CPU,
        }
    }

    /// Map a source field name onto a metric. Unknown names yield `None`.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            field_names::TEMPERATURE => Some(Metric::Temperature),
            field_names::HUMIDITY => Some(Metric::Humidity),
            field_names::CPU => Some(Metric::Cpu),
            _ => None,
        }
    }
}

/// One canonical sensor reading.
///
/// Metrics the source did not report are `None`; they are never zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    pub sensor_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub cpu: Option<f64>,
}

impl SensorRecord {
    /// Record with every metric absent.
    pub fn empty(sensor_id: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id,
            timestamp,
            temperature: None,
            humidity: None,
            cpu: None,
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Cpu => self.cpu,
        }
    }

    pub fn set_metric(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::Cpu => &mut self.cpu,
        };
        *slot = value;
    }
}

/// Ordered records extracted for one window.
///
/// Order is the source's return order; it is not guaranteed to be chronological.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorBatch {
    window: TimeWindow,
    records: Vec<SensorRecord>,
}

impl SensorBatch {
    pub fn new(window: TimeWindow, records: Vec<SensorRecord>) -> Self {
        Self { window, records }
    }

    pub fn empty(window: TimeWindow) -> Self {
        Self::new(window, Vec::new())
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<SensorRecord> {
        self.records
    }
}

/// Fixed-width RFC 3339 rendering with nanosecond precision and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
