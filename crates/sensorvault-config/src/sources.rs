// Configuration source loading.
//
// Priority order:
// 1. Environment variables (SENSORVAULT_* prefix, plus INFLUXDB_TOKEN)
// 2. Config file path from SENSORVAULT_CONFIG
// 3. Inline config content from SENSORVAULT_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.sensorvault.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["./config.toml", "./.sensorvault.toml"];

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let config = load_from_file()?.unwrap_or_default();
    finish(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("SENSORVAULT_CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("SENSORVAULT_CONFIG_CONTENT") {
        let config = RuntimeConfig::from_toml(&content)
            .context("Failed to parse inline config from SENSORVAULT_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RuntimeConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let config = read_file(path.as_ref())?;
    finish(config)
}

/// Load configuration with graceful fallback to defaults.
/// Tries standard config file locations, returns defaults if none can be read.
pub fn load_or_default() -> Result<RuntimeConfig> {
    let config = match load_from_file() {
        Ok(Some(config)) => config,
        Ok(None) => RuntimeConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable config file; using defaults");
            RuntimeConfig::default()
        }
    };
    finish(config)
}

fn finish(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}
