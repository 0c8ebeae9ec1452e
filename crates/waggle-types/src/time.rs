use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// Parses a SQLite TEXT timestamp into a UTC datetime.
///
/// Accepts RFC 3339 as well as the bare `datetime('now')` format
/// "YYYY-MM-DD HH:MM:SS", which carries no timezone and is treated as UTC.
pub fn parse_sqlite_datetime(raw: &str) -> chrono::ParseResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

/// Like [`parse_sqlite_datetime`] but never fails: a corrupt value is logged
/// with the given row context and replaced with the epoch.
pub fn parse_sqlite_datetime_lossy(raw: &str, context: &str) -> DateTime<Utc> {
    parse_sqlite_datetime(raw).unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
        DateTime::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_sqlite_format_as_utc() {
        let dt = parse_sqlite_datetime("2026-08-25 10:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-08-25T10:30:00+00:00");
    }

    #[test]
    fn parses_rfc3339() {
        let dt = parse_sqlite_datetime("2026-08-25T10:30:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-08-25T10:30:00+00:00");
    }

    #[test]
    fn lossy_falls_back_to_epoch_on_garbage() {
        let dt = parse_sqlite_datetime_lossy("not a date", "message 'test'");
        assert_eq!(dt, DateTime::<Utc>::default());
    }
}
