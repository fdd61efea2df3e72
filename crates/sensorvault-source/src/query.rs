//! Bounded range queries and their Flux rendering

use sensorvault_core::{format_timestamp, TimeWindow};

/// `measurement == M AND time in [start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub measurement: String,
    pub window: TimeWindow,
}

impl RangeQuery {
    pub fn new(measurement: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            measurement: measurement.into(),
            window,
        }
    }

    /// Render as a Flux script. `range` is start-inclusive and stop-exclusive,
    /// which matches the window's half-open interval.
    pub fn to_flux(&self, bucket: &str) -> String {
        format!(
            "from(bucket: {bucket})\n  |> range(start: {start}, stop: {stop})\n  |> filter(fn: (r) => r._measurement == {measurement})",
            bucket = flux_string(bucket),
            start = format_timestamp(self.window.start()),
            stop = format_timestamp(self.window.end()),
            measurement = flux_string(&self.measurement),
        )
    }
}

/// Quote a value as a Flux string literal.
fn flux_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
