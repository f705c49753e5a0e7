//! Performer source for processes and measurements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::GemdError;

/// One `@`, something before it, and at least one `.` after it.
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]*\.[^@\s]*[^@\s.]$";

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN));

/// Who performed a process or measurement, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_date: Option<DateTime<Utc>>,
}

impl Source {
    /// Validate raw inputs into a source.
    ///
    /// Returns `Ok(None)` when both inputs are absent.
    pub fn parse(email: Option<&str>, iso_date: Option<&str>) -> Result<Option<Self>, GemdError> {
        if email.is_none() && iso_date.is_none() {
            return Ok(None);
        }
        let performed_by = email
            .map(|e| validate_email(e).map(|()| e.to_string()))
            .transpose()?;
        let performed_date = iso_date.map(parse_iso_date).transpose()?;
        Ok(Some(Self {
            performed_by,
            performed_date,
        }))
    }
}

/// Check an email address against the performer pattern.
pub fn validate_email(email: &str) -> Result<(), GemdError> {
    let re = EMAIL_RE
        .as_ref()
        .map_err(|e| GemdError::InvalidEmail(e.to_string()))?;
    if email.matches('@').count() == 1 && re.is_match(email) {
        Ok(())
    } else {
        Err(GemdError::InvalidEmail(format!("'{}'", email)))
    }
}

/// Parse an ISO 8601 instant.
///
/// Accepts RFC 3339 with an offset, a naive date-time (taken as UTC) or a bare
/// date (midnight UTC).
pub fn parse_iso_date(raw: &str) -> Result<DateTime<Utc>, GemdError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(GemdError::BadTimestamp(format!(
        "'{}' is not an ISO 8601 instant",
        raw
    )))
}
