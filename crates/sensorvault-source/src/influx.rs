// InfluxDB v2 HTTP source
//
// Queries go to `POST {url}/api/v2/query?org={org}` with a raw Flux body and
// ask for annotated CSV back. Transport failures, timeouts and non-success
// statuses are `SourceError::Unavailable`; a 200 with an unreadable body is
// `SourceError::InvalidResponse`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use sensorvault_config::SourceConfig;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::annotated_csv::parse_annotated_csv;
use crate::error::{Result, SourceError};
use crate::query::RangeQuery;
use crate::row::SourceRow;
use crate::source::RecordSource;

/// Longest error body excerpt carried into an error message
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct InfluxSource {
    client: reqwest::Client,
    base_url: String,
    org: String,
    bucket: String,
    token: Option<String>,
}

impl InfluxSource {
    pub fn new(
        base_url: &str,
        org: &str,
        bucket: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            org: org.to_string(),
            bucket: bucket.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.url,
            &config.org,
            &config.bucket,
            config.token.clone(),
            config.timeout(),
        )
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| SourceError::unavailable("no InfluxDB token configured"))
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(SourceError::unavailable(format!(
        "HTTP {status}: {}",
        excerpt.trim()
    )))
}

#[async_trait]
impl RecordSource for InfluxSource {
    fn name(&self) -> &str {
        "influxdb"
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        error_for_status(response).await.map(|_| ())
    }

    #[instrument(skip(self, query), fields(window = %query.window, measurement = %query.measurement))]
    async fn query(&self, query: &RangeQuery) -> Result<Vec<SourceRow>> {
        let token = self.token()?;
        let flux = query.to_flux(&self.bucket);

        let response = self
            .client
            .post(format!("{}/api/v2/query", self.base_url))
            .query(&[("org", self.org.as_str())])
            .header(AUTHORIZATION, format!("Token {token}"))
            .header(CONTENT_TYPE, "application/vnd.flux")
            .header(ACCEPT, "application/csv")
            .body(flux)
            .send()
            .await?;

        let body = error_for_status(response).await?.text().await?;
        let rows = parse_annotated_csv(&body)?;
        debug!(rows = rows.len(), bytes = body.len(), "InfluxDB query complete");
        Ok(rows)
    }
}
