use async_trait::async_trait;

use crate::error::Result;
use crate::query::RangeQuery;
use crate::row::SourceRow;

/// A time-series backend that answers bounded range queries.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short label for logs and status output
    fn name(&self) -> &str;

    /// Whether enough connection parameters are present to issue queries
    fn is_configured(&self) -> bool {
        true
    }

    /// Cheap reachability probe used by status reporting.
    async fn health(&self) -> Result<()>;

    /// Run one bounded query. An empty result is `Ok(vec![])`, never an error.
    async fn query(&self, query: &RangeQuery) -> Result<Vec<SourceRow>>;
}
