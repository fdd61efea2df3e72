//! Error types for source extraction

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Source cannot be reached, timed out, rejected the request, or is not configured
    #[error("time-series source unavailable: {reason}")]
    Unavailable { reason: String },

    /// Source answered, but the body could not be understood
    #[error("invalid response from time-series source: {reason}")]
    InvalidResponse { reason: String },
}

impl SourceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Stable taxonomy name used in status output and HTTP responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "SourceUnavailable",
            Self::InvalidResponse { .. } => "SourceInvalidResponse",
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::invalid(err.to_string())
        } else {
            Self::unavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
