// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

/// Longest accepted cadence: one leap year
const MAX_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_archive_config(&config.archive)?;
    validate_source_config(&config.source)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    Ok(())
}

fn validate_archive_config(config: &ArchiveConfig) -> Result<()> {
    if config.interval_secs == 0 {
        bail!("archive.interval_secs must be greater than 0");
    }
    if config.interval_secs > MAX_INTERVAL_SECS {
        bail!(
            "archive.interval_secs must be at most {} (one year), got {}",
            MAX_INTERVAL_SECS,
            config.interval_secs
        );
    }

    validate_path_segment("archive.category", &config.category)?;
    validate_path_segment("archive.container", &config.container)?;

    if config.upload_attempts == 0 {
        bail!("archive.upload_attempts must be at least 1");
    }

    if config.recent_files_limit == 0 {
        bail!("archive.recent_files_limit must be greater than 0");
    }

    if config.status_timeout_secs == 0 {
        bail!("archive.status_timeout_secs must be greater than 0");
    }

    if config.interval_secs < 60 {
        warn!(
            interval_secs = config.interval_secs,
            "archive.interval_secs is below one minute; windows will be very small"
        );
    }

    if config.cooldown_secs == 0 {
        warn!("archive.cooldown_secs is 0; a failing cycle will be retried immediately");
    }

    Ok(())
}

fn validate_path_segment(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} must not be empty", name);
    }
    if value.contains('/') || value.contains('\\') {
        bail!("{} must not contain path separators: {:?}", name, value);
    }
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<()> {
    if config.measurement.is_empty() {
        bail!("source.measurement must not be empty");
    }

    if config.backend == SourceBackend::InfluxDb {
        if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            bail!("source.url must be an http(s) URL, got {:?}", config.url);
        }
        if config.org.is_empty() {
            bail!("source.org is required for the influxdb backend");
        }
        if config.bucket.is_empty() {
            bail!("source.bucket is required for the influxdb backend");
        }
        if config.timeout_secs == 0 {
            bail!("source.timeout_secs must be greater than 0");
        }
        if config.token.as_deref().map_or(true, str::is_empty) {
            warn!("source.token is not set; archive cycles will fail with SourceUnavailable");
        }
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("memory storage backend selected; archives will not survive a restart");
        }
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.path.is_empty() {
                bail!("storage.fs.path must not be empty");
            }
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 storage backend requires 's3' configuration"))?;

            if s3.bucket.is_empty() {
                bail!("storage.s3.bucket is required for S3 backend");
            }

            if s3.region.is_empty() {
                bail!("storage.s3.region is required for S3 backend");
            }
        }
        StorageBackend::Swift => {
            let swift = config.swift.as_ref().ok_or_else(|| {
                anyhow::anyhow!("swift storage backend requires 'swift' configuration")
            })?;

            if swift.endpoint.is_empty() {
                bail!("storage.swift.endpoint is required for Swift backend");
            }

            if swift.container.is_empty() {
                bail!("storage.swift.container is required for Swift backend");
            }
        }
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.listen_addr.is_empty() {
        bail!("server.listen_addr must not be empty");
    }

    if !config.listen_addr.contains(':') {
        bail!(
            "server.listen_addr must include a port (e.g., '0.0.0.0:8080'), got: {}",
            config.listen_addr
        );
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.log_level.to_lowercase().as_str()) {
        warn!(
            log_level = %config.log_level,
            "server.log_level is not a standard level; it will be used as a filter directive"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = RuntimeConfig::default();
        config.archive.interval_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn test_rejects_interval_longer_than_a_year() {
        let mut config = RuntimeConfig::default();
        config.archive.interval_secs = MAX_INTERVAL_SECS;
        assert!(validate_config(&config).is_ok());

        config.archive.interval_secs = MAX_INTERVAL_SECS + 1;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("one year"));
    }

    #[test]
    fn test_rejects_category_with_separator() {
        let mut config = RuntimeConfig::default();
        config.archive.category = "hourly/extra".to_string();
        assert!(validate_config(&config).is_err());

        config.archive.category = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_upload_attempts() {
        let mut config = RuntimeConfig::default();
        config.archive.upload_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_influx_requires_http_url() {
        let mut config = RuntimeConfig::default();
        config.source.url = "localhost:8086".to_string();
        assert!(validate_config(&config).is_err());

        config.source.backend = SourceBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_s3_requires_section() {
        let mut config = RuntimeConfig::default();
        config.storage.backend = StorageBackend::S3;
        assert!(validate_config(&config).is_err());

        config.storage.s3 = Some(S3Config {
            bucket: "archive".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_listen_addr_requires_port() {
        let mut config = RuntimeConfig::default();
        config.server.listen_addr = "localhost".to_string();
        assert!(validate_config(&config).is_err());
    }
}
