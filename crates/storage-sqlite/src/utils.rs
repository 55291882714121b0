//! Utility functions for SQLite storage operations.
//!
//! Timestamps are stored as TEXT; these helpers keep the on-disk format in
//! one place.

use chrono::NaiveDateTime;

use crate::errors::StorageError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, StorageError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        StorageError::SerializationError(format!("Invalid timestamp '{}': {}", value, e))
    })
}
