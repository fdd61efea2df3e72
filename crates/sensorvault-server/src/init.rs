// Initialization utilities for server mode
//
// Archive service wiring and logging/tracing setup

use anyhow::{Context, Result};
use sensorvault_config::{LogFormat, RuntimeConfig, ServerConfig};
use sensorvault_pipeline::ArchiveService;
use sensorvault_source::source_from_config;
use sensorvault_storage::sink_from_config;
use std::sync::Arc;
use tracing::info;

/// Build the archive service from a resolved configuration
pub fn init_service(config: &RuntimeConfig) -> Result<Arc<ArchiveService>> {
    info!(
        "Initializing archive service with storage backend: {}",
        config.storage.backend
    );
    let sink = sink_from_config(&config.storage).context("Failed to initialize storage sink")?;

    info!("Using source backend: {}", config.source.backend);
    let source = source_from_config(&config.source).context("Failed to initialize source")?;
    if !source.is_configured() {
        info!("Source is not fully configured; archive cycles will fail until it is");
    }

    Ok(Arc::new(ArchiveService::from_config(
        config,
        Arc::new(sink),
        source,
    )))
}

/// Initialize tracing/logging from the server section.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing(server: &ServerConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
    };
}
