//! Operator construction from [`StorageConfig`]

use anyhow::{anyhow, Context, Result};
use opendal::{services, Operator};
use sensorvault_config::{StorageBackend, StorageConfig};

use crate::opendal_sink::OpenDalSink;

/// Build an OpenDAL operator for the configured backend.
pub fn build_operator(config: &StorageConfig) -> Result<Operator> {
    let operator = match config.backend {
        StorageBackend::Memory => Operator::new(services::Memory::default())
            .context("Failed to create memory operator")?
            .finish(),
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow!("fs config required for filesystem backend"))?;

            Operator::new(services::Fs::default().root(&fs.path))
                .with_context(|| format!("Failed to create filesystem operator at {}", fs.path))?
                .finish()
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow!("s3 config required for S3 backend"))?;

            let mut builder = services::S3::default()
                .bucket(&s3.bucket)
                .region(&s3.region);
            if let Some(endpoint) = &s3.endpoint {
                builder = builder.endpoint(endpoint);
            }

            Operator::new(builder)
                .context("Failed to create S3 operator")?
                .finish()
        }
        StorageBackend::Swift => {
            let swift = config
                .swift
                .as_ref()
                .ok_or_else(|| anyhow!("swift config required for Swift backend"))?;

            let mut builder = services::Swift::default()
                .endpoint(&swift.endpoint)
                .container(&swift.container);
            if let Some(token) = &swift.token {
                builder = builder.token(token);
            }

            Operator::new(builder)
                .context("Failed to create Swift operator")?
                .finish()
        }
    };

    tracing::debug!(backend = %config.backend, "Storage operator initialized");
    Ok(operator)
}

/// Convenience wrapper returning a ready-to-use sink.
pub fn sink_from_config(config: &StorageConfig) -> Result<OpenDalSink> {
    build_operator(config).map(OpenDalSink::new)
}
