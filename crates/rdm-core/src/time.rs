//! # Astronomical Time
//!
//! `Time` is the in-memory form of time-valued scalars such as the file
//! date of a data product. Values are held in UTC; the canonical string
//! form is ISO-8601 "isot" with millisecond precision
//! (`2020-01-01T00:00:00.000`), which is what flattening emits.
//!
//! Parsing is lenient about input shape (RFC 3339 with any offset, naive
//! date-times with `T` or space separator, bare dates) because times arrive
//! from hand-written metadata as often as from serialized files.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RdmError;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A UTC time instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time(DateTime<Utc>);

impl Time {
    /// Wrap a UTC date-time.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Interpret a naive date-time as UTC.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.and_utc())
    }

    /// Parse a time string.
    ///
    /// Accepts RFC 3339 (converted to UTC), naive `YYYY-MM-DDTHH:MM:SS[.f]`
    /// or `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC), and bare dates
    /// (midnight UTC).
    ///
    /// # Errors
    ///
    /// Returns [`RdmError::InvalidTime`] when no accepted shape matches.
    pub fn parse(input: &str) -> Result<Self, RdmError> {
        let trimmed = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_naive(dt));
            }
        }
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| {
            RdmError::InvalidTime {
                input: input.to_string(),
                reason: e.to_string(),
            }
        })?;
        date.and_hms_opt(0, 0, 0)
            .map(Self::from_naive)
            .ok_or_else(|| RdmError::InvalidTime {
                input: input.to_string(),
                reason: "date has no midnight".to_string(),
            })
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render in "isot" form with millisecond precision.
    pub fn to_isot(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_isot())
    }
}
