//! Error types for the core crate

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::payload::ArchiveFormat;

/// A record batch could not be rendered in one archive format.
///
/// Raised per format; a failure here never affects the other formats of the
/// same cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializationError {
    /// NaN or infinity in a format that cannot represent it
    #[error("{format}: non-finite value in field '{field}' of record {index}")]
    NonFiniteValue {
        format: ArchiveFormat,
        field: &'static str,
        index: usize,
    },

    /// Timestamp outside the range of the format's timestamp type
    #[error("{format}: timestamp {timestamp} of record {index} is out of range")]
    TimestampOutOfRange {
        format: ArchiveFormat,
        timestamp: DateTime<Utc>,
        index: usize,
    },

    /// Encoder failure (Arrow, Parquet, CSV or JSON writer)
    #[error("{format} encoding failed: {reason}")]
    Encoding {
        format: ArchiveFormat,
        reason: String,
    },
}

impl SerializationError {
    pub(crate) fn encoding(format: ArchiveFormat, reason: impl ToString) -> Self {
        Self::Encoding {
            format,
            reason: reason.to_string(),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            Self::NonFiniteValue { format, .. }
            | Self::TimestampOutOfRange { format, .. }
            | Self::Encoding { format, .. } => *format,
        }
    }

    pub fn error_type(&self) -> &'static str {
        "SerializationError"
    }
}

/// Invalid time window bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window end {end} precedes start {start}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("window span of {seconds}s is negative")]
    NegativeSpan { seconds: i64 },

    #[error("window span of {seconds}s is out of range")]
    SpanOutOfRange { seconds: i64 },
}
