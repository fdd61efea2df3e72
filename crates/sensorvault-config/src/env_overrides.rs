use super::{LogFormat, RuntimeConfig, S3Config, SwiftConfig};
use super::{FsConfig, SourceBackend, StorageBackend};
use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

pub const ENV_PREFIX: &str = "SENSORVAULT_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the SENSORVAULT_ prefix
    /// Used for conventional variables such as INFLUXDB_TOKEN
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Archive cadence and naming
    if let Some(val) = get_env_parsed::<u64, _>(env, "ARCHIVE_INTERVAL_SECS")? {
        config.archive.interval_secs = val;
    }
    if let Some(category) = env.get("ARCHIVE_CATEGORY") {
        config.archive.category = category;
    }
    if let Some(container) = env.get("ARCHIVE_CONTAINER") {
        config.archive.container = container;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "ARCHIVE_COOLDOWN_SECS")? {
        config.archive.cooldown_secs = val;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "ARCHIVE_STOP_TIMEOUT_SECS")? {
        config.archive.stop_timeout_secs = val;
    }
    if let Some(val) = get_env_parsed::<usize, _>(env, "ARCHIVE_RECENT_FILES_LIMIT")? {
        config.archive.recent_files_limit = val;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "ARCHIVE_STATUS_TIMEOUT_SECS")? {
        config.archive.status_timeout_secs = val;
    }
    if let Some(val) = get_env_parsed::<u32, _>(env, "ARCHIVE_UPLOAD_ATTEMPTS")? {
        config.archive.upload_attempts = val;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "ARCHIVE_UPLOAD_BACKOFF_MS")? {
        config.archive.upload_backoff_ms = val;
    }

    // Source connection
    if let Some(backend) = env.get("SOURCE_BACKEND") {
        config.source.backend = backend
            .parse::<SourceBackend>()
            .context("Invalid SENSORVAULT_SOURCE_BACKEND value")?;
    }
    if let Some(url) = env.get("SOURCE_URL") {
        config.source.url = url;
    }
    if let Some(org) = env.get("SOURCE_ORG") {
        config.source.org = org;
    }
    if let Some(bucket) = env.get("SOURCE_BUCKET") {
        config.source.bucket = bucket;
    }
    if let Some(measurement) = env.get("SOURCE_MEASUREMENT") {
        config.source.measurement = measurement;
    }
    // Prefixed token wins over the conventional INFLUXDB_TOKEN
    if let Some(token) = env.get("SOURCE_TOKEN").or_else(|| env.get_raw("INFLUXDB_TOKEN")) {
        config.source.token = Some(token);
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "SOURCE_TIMEOUT_SECS")? {
        config.source.timeout_secs = val;
    }

    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid SENSORVAULT_STORAGE_BACKEND value")?;
    }
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }
    if let Some(bucket) = env.get("S3_BUCKET") {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get("S3_REGION") {
        ensure_s3(config).region = region;
    }
    if let Some(endpoint) = env.get("S3_ENDPOINT") {
        ensure_s3(config).endpoint = Some(endpoint);
    }
    if let Some(endpoint) = env.get("SWIFT_ENDPOINT") {
        ensure_swift(config).endpoint = endpoint;
    }
    if let Some(container) = env.get("SWIFT_CONTAINER") {
        ensure_swift(config).container = container;
    }
    if let Some(token) = env.get("SWIFT_TOKEN") {
        ensure_swift(config).token = Some(token);
    }

    // Server configuration (listen addr, log level/format)
    if let Some(addr) = env.get("LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Some(level) = env.get("LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.server.log_format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    Ok(())
}

fn ensure_s3(config: &mut RuntimeConfig) -> &mut S3Config {
    config.storage.s3.get_or_insert_with(|| S3Config {
        bucket: String::new(),
        region: String::new(),
        endpoint: None,
    })
}

fn ensure_swift(config: &mut RuntimeConfig) -> &mut SwiftConfig {
    config.storage.swift.get_or_insert_with(|| SwiftConfig {
        endpoint: String::new(),
        container: String::new(),
        token: None,
    })
}

fn get_env_parsed<T, E>(env: &E, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: EnvSource,
{
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
