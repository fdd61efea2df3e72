//! Error types for the storage sink adapter

use thiserror::Error;

/// Errors surfaced by an [`ObjectSink`](crate::ObjectSink).
///
/// The adapter never retries; callers decide whether an error is worth
/// another attempt via [`StorageError::is_retryable`].
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Backend could not be reached or refused to serve the container
    #[error("storage backend unavailable for container '{container}': {reason}")]
    Unavailable { container: String, reason: String },

    /// Object write failed; carries the backend's diagnostic
    #[error("failed to write '{name}': {reason}")]
    PutFailed {
        name: String,
        reason: String,
        temporary: bool,
    },

    #[error("object '{name}' not found in container '{container}'")]
    ObjectNotFound { container: String, name: String },

    /// Any other backend failure (read, list, delete)
    #[error("storage {operation} failed for '{path}': {reason}")]
    Backend {
        operation: &'static str,
        path: String,
        reason: String,
    },
}

impl StorageError {
    /// Stable taxonomy name used in status output and HTTP responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "StorageUnavailable",
            Self::PutFailed { .. } => "StoragePutError",
            Self::ObjectNotFound { .. } => "ObjectNotFound",
            Self::Backend { .. } => "StorageError",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::PutFailed { temporary, .. } => *temporary,
            Self::ObjectNotFound { .. } | Self::Backend { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_names() {
        let put = StorageError::PutFailed {
            name: "hourly/20240101_000000.json".into(),
            reason: "boom".into(),
            temporary: false,
        };
        assert_eq!(put.error_type(), "StoragePutError");
        assert!(!put.is_retryable());
        assert!(put.to_string().contains("hourly/20240101_000000.json"));

        let unavailable = StorageError::Unavailable {
            container: "c".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(unavailable.error_type(), "StorageUnavailable");
        assert!(unavailable.is_retryable());
    }
}
