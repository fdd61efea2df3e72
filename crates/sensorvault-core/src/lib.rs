// sensorvault-core - Platform-agnostic archive model
//
// This crate contains the PURE data-shaping logic of the archive pipeline:
// sensor records, time windows, deterministic object naming and the three
// archive serializers (JSON, CSV, Parquet). No I/O, no async, no runtime
// dependencies.
//
// Everything that talks to a time-series source or an object store lives in
// sibling crates and depends on the types defined here.

pub mod error;
pub mod field_names;
pub mod naming;
pub mod payload;
pub mod schema;
pub mod serialize;
pub mod types;

pub use error::{SerializationError, WindowError};
pub use naming::{object_name, parse_object_name, WINDOW_START_FORMAT};
pub use payload::{ArchiveFormat, ArchivePayload, ContentHash};
pub use schema::sensor_schema;
pub use types::{format_timestamp, parse_timestamp, Metric, SensorBatch, SensorRecord, TimeWindow};
