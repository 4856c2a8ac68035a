use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::TypeError;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parse an ISO-8601 instant as accepted in `before` queries.
///
/// Accepts RFC 3339 (`2020-07-01T05:11:21Z`), a zone-less date-time taken as
/// UTC, or a bare date (`1980-01-01`) meaning midnight UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, TypeError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    Err(TypeError::InvalidInstant(s.to_string()))
}

/// Render an instant as RFC 3339 with second precision (`2020-07-01T05:11:21Z`).
pub fn format_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render an instant as an HTTP date (`Wed, 01 Jul 2020 05:11:21 GMT`).
pub fn format_http_date(instant: &DateTime<Utc>) -> String {
    instant.format(HTTP_DATE).to_string()
}

/// Parse an HTTP date header value.
pub fn parse_http_date(s: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc2822(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TypeError::InvalidInstant(s.to_string()))
}
