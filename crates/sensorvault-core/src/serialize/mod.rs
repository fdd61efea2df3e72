// Archive serializers
//
// Three pure functions, one per format, each `SensorBatch -> bytes`. All of
// them are deterministic: the same batch always renders to the same bytes,
// which is what makes overwriting an archived window safe.

pub mod csv;
pub mod json;
pub mod parquet;

pub use self::csv::serialize_csv;
pub use self::json::serialize_json;
pub use self::parquet::serialize_parquet;
