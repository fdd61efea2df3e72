// sensorvault-source - Source extractor
//
// Issues bounded range queries against a time-series backend and pivots the
// returned rows into canonical sensor records. InfluxDB v2 is the production
// backend; `MemorySource` serves tests and database-less deployments.

mod annotated_csv;
mod error;
mod extractor;
mod influx;
mod memory;
mod query;
mod row;
mod source;

use anyhow::Result;
use sensorvault_config::{SourceBackend, SourceConfig};
use std::sync::Arc;

pub use annotated_csv::parse_annotated_csv;
pub use error::SourceError;
pub use extractor::{pivot_rows, Extractor};
pub use influx::InfluxSource;
pub use memory::MemorySource;
pub use query::RangeQuery;
pub use row::SourceRow;
pub use source::RecordSource;

/// Build the configured source.
pub fn source_from_config(config: &SourceConfig) -> Result<Arc<dyn RecordSource>> {
    let source: Arc<dyn RecordSource> = match config.backend {
        SourceBackend::InfluxDb => Arc::new(InfluxSource::from_config(config)?),
        SourceBackend::Memory => Arc::new(MemorySource::new()),
    };
    tracing::debug!(backend = %config.backend, "Source initialized");
    Ok(source)
}
