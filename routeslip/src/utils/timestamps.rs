//! Timestamps attached to diagnostic records.

use chrono::{DateTime, Utc};

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp as ISO 8601 with microseconds and an explicit offset:
/// `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
#[must_use]
pub fn format_iso8601(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC time formatted by [`format_iso8601`].
///
/// # Examples
///
/// ```
/// use routeslip::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_iso8601() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_iso8601(&ts), "2024-01-15T10:30:00.000000+00:00");
    }

    #[test]
    fn test_iso_timestamp_parses_back() {
        let ts = iso_timestamp();
        assert!(DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
