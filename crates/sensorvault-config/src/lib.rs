// sensorvault-config - Unified configuration for the archive service
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from SENSORVAULT_CONFIG env var
// 3. Config file contents from SENSORVAULT_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.sensorvault.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Archive cadence, naming and job behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub interval_secs: u64,
    pub category: String,
    pub container: String,
    pub cooldown_secs: u64,
    pub stop_timeout_secs: u64,
    pub recent_files_limit: usize,
    pub status_timeout_secs: u64,
    pub upload_attempts: u32,
    pub upload_backoff_ms: u64,
}

impl ArchiveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn upload_backoff(&self) -> Duration {
        Duration::from_millis(self.upload_backoff_ms)
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            category: "hourly".to_string(),
            container: "sensor-archive".to_string(),
            cooldown_secs: 60,
            stop_timeout_secs: 5,
            recent_files_limit: 10,
            status_timeout_secs: 5,
            upload_attempts: 1,
            upload_backoff_ms: 500,
        }
    }
}

/// Time-series source connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub backend: SourceBackend,
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::InfluxDb,
            url: "http://localhost:8086".to_string(),
            org: "Dev Team".to_string(),
            bucket: "Sensor Data".to_string(),
            measurement: "sensors".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    #[serde(rename = "influxdb")]
    InfluxDb,
    Memory,
}

impl std::fmt::Display for SourceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceBackend::InfluxDb => write!(f, "influxdb"),
            SourceBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for SourceBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "influxdb" | "influx" => Ok(SourceBackend::InfluxDb),
            "memory" | "mem" => Ok(SourceBackend::Memory),
            _ => anyhow::bail!("Unsupported source backend: {}. Supported: influxdb, memory", s),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift: Option<SwiftConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            fs: Some(FsConfig::default()),
            s3: None,
            swift: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Fs,
    S3,
    Swift,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Swift => write!(f, "swift"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            "swift" | "openstack" => Ok(StorageBackend::Swift),
            _ => anyhow::bail!(
                "Unsupported storage backend: {}. Supported: memory, fs, s3, swift",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// OpenStack Swift endpoint, e.g. `http://localhost:8080/v1/AUTH_test`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwiftConfig {
    pub endpoint: String,
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// HTTP surface and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from an explicit file (CLI `--config`), then apply env overrides
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Like [`RuntimeConfig::load`], but unreadable default files fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Parse a TOML document on top of the built-in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("fs".parse::<StorageBackend>().unwrap(), StorageBackend::Fs);
        assert_eq!("s3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(
            "openstack".parse::<StorageBackend>().unwrap(),
            StorageBackend::Swift
        );
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("gcs".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.archive.interval(), Duration::from_secs(3600));
        assert_eq!(config.archive.category, "hourly");
        assert_eq!(config.source.measurement, "sensors");
        assert_eq!(config.storage.backend, StorageBackend::Fs);
        assert_eq!(config.server.log_format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml(
            r#"
            [archive]
            interval_secs = 600

            [source]
            backend = "memory"

            [storage]
            backend = "swift"

            [storage.swift]
            endpoint = "http://localhost:8080/v1/AUTH_test"
            container = "archive"
            "#,
        )
        .unwrap();

        assert_eq!(config.archive.interval_secs, 600);
        assert_eq!(config.archive.container, "sensor-archive");
        assert_eq!(config.source.backend, SourceBackend::Memory);
        assert_eq!(config.storage.backend, StorageBackend::Swift);
        assert_eq!(config.storage.swift.as_ref().unwrap().container, "archive");
        assert!(config.validate().is_ok());
    }
}
