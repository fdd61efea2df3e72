// Parser for InfluxDB annotated CSV query responses
//
// A response is a sequence of tables. Each table starts with `#group`,
// `#datatype` and `#default` annotation rows followed by a header row, and
// tables are separated by blank lines. Failed queries come back as a table
// with an `error` column instead of data.
//
// Two data shapes are understood:
// - one row per field, with `_field` / `_value` columns (the default)
// - pivoted rows, where metric names are columns of their own

use csv::{ReaderBuilder, StringRecord};
use sensorvault_core::field_names::SENSOR_ID;
use sensorvault_core::{parse_timestamp, Metric};
use tracing::warn;

use crate::error::{Result, SourceError};
use crate::row::SourceRow;

const TIME: &str = "_time";
const FIELD: &str = "_field";
const VALUE: &str = "_value";
const ERROR: &str = "error";

struct DataColumns {
    time: usize,
    sensor_id: Option<usize>,
    field: Option<usize>,
    value: Option<usize>,
    metrics: Vec<(usize, String)>,
}

enum Table {
    Data(DataColumns),
    Error { message: usize },
}

impl Table {
    fn is_header(record: &StringRecord) -> bool {
        matches!(record.get(1), Some("result") | Some(ERROR)) || record.iter().any(|c| c == TIME)
    }

    fn from_header(record: &StringRecord) -> Result<Self> {
        let position = |name: &str| record.iter().position(|c| c == name);

        if let Some(message) = position(ERROR) {
            if position(TIME).is_none() {
                return Ok(Table::Error { message });
            }
        }

        let time = position(TIME)
            .ok_or_else(|| SourceError::invalid("table header has no _time column"))?;

        let metrics = record
            .iter()
            .enumerate()
            .filter(|(_, name)| Metric::from_field(name).is_some())
            .map(|(i, name)| (i, name.to_string()))
            .collect();

        Ok(Table::Data(DataColumns {
            time,
            sensor_id: position(SENSOR_ID),
            field: position(FIELD),
            value: position(VALUE),
            metrics,
        }))
    }
}

impl DataColumns {
    fn parse_row(&self, record: &StringRecord) -> Result<SourceRow> {
        let time_text = record.get(self.time).unwrap_or_default();
        let timestamp = parse_timestamp(time_text)
            .ok_or_else(|| SourceError::invalid(format!("unparsable _time value {time_text:?}")))?;

        let sensor_id = self
            .sensor_id
            .and_then(|i| record.get(i))
            .filter(|id| !id.is_empty());
        let mut row = SourceRow::new(sensor_id, timestamp);

        match (self.field, self.value) {
            (Some(field), Some(value)) => {
                let name = record.get(field).unwrap_or_default();
                let parsed = parse_value(name, record.get(value));
                row = row.with_field(name, parsed);
            }
            _ => {
                for (index, name) in &self.metrics {
                    let parsed = parse_value(name, record.get(*index));
                    row = row.with_field(name.as_str(), parsed);
                }
            }
        }

        Ok(row)
    }
}

fn parse_value(field: &str, cell: Option<&str>) -> Option<f64> {
    let text = cell.map(str::trim).filter(|t| !t.is_empty())?;
    match text.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            // Non-metric fields (strings, booleans) are dropped by the pivot anyway
            if Metric::from_field(field).is_some() {
                warn!(field, value = text, "Unparsable metric value; treating as absent");
            }
            None
        }
    }
}

/// Parse a complete annotated CSV body into rows, in response order.
pub fn parse_annotated_csv(body: &str) -> Result<Vec<SourceRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut table: Option<Table> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| SourceError::invalid(format!("malformed CSV: {e}")))?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }

        if Table::is_header(&record) {
            table = Some(Table::from_header(&record)?);
            continue;
        }

        match &table {
            Some(Table::Data(columns)) => rows.push(columns.parse_row(&record)?),
            Some(Table::Error { message }) => {
                let message = record.get(*message).unwrap_or("unknown error");
                return Err(SourceError::invalid(format!("query failed: {message}")));
            }
            None => return Err(SourceError::invalid("data row before table header")),
        }
    }

    Ok(rows)
}
