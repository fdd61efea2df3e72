//! Deterministic object naming for archive payloads
//!
//! Generates names of the form:
//! `{category}/{window_start_compact}.{ext}` e.g. `hourly/20240101_000000.parquet`
//!
//! The name depends only on the category, the format and the window start, so
//! re-archiving a window overwrites the previous object instead of adding one.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::payload::ArchiveFormat;

/// Fixed-width `strftime` pattern for the window start component.
pub const WINDOW_START_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Build the object name for one format of one window.
pub fn object_name(category: &str, format: ArchiveFormat, window_start: DateTime<Utc>) -> String {
    format!(
        "{}/{}.{}",
        category.trim_end_matches('/'),
        window_start.format(WINDOW_START_FORMAT),
        format.extension()
    )
}

/// Split an object name back into `(category, window_start, format)`.
///
/// Returns `None` for names that were not produced by [`object_name`].
pub fn parse_object_name(name: &str) -> Option<(&str, DateTime<Utc>, ArchiveFormat)> {
    let (category, file_name) = name.rsplit_once('/')?;
    let (stamp, ext) = file_name.rsplit_once('.')?;
    let format = ArchiveFormat::from_extension(ext)?;
    let start = NaiveDateTime::parse_from_str(stamp, WINDOW_START_FORMAT)
        .ok()?
        .and_utc();
    Some((category, start, format))
}
