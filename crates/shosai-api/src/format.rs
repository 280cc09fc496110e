//! Display formatting helpers for server-provided values.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a server timestamp. Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a UTC timestamp as a human-readable relative time string.
pub fn relative_time(dt: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - *dt).num_seconds().max(0);

    if secs < 60 {
        "just now".into()
    } else if secs < 3600 {
        let m = secs / 60;
        format!("{m}m ago")
    } else if secs < 86400 {
        let h = secs / 3600;
        format!("{h}h ago")
    } else {
        let d = secs / 86400;
        format!("{d}d ago")
    }
}

/// Relative time for a raw server timestamp; unparseable input is returned as-is.
pub fn relative_time_from_now(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => relative_time(&dt, Utc::now()),
        None => raw.to_string(),
    }
}

/// Round to two decimal places, the precision progress is persisted with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_both_formats() {
        let a = parse_timestamp("2024-03-01T10:00:00Z").unwrap();
        let b = parse_timestamp("2024-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let at = |secs: i64| now - chrono::Duration::seconds(secs);
        assert_eq!(relative_time(&at(5), now), "just now");
        assert_eq!(relative_time(&at(125), now), "2m ago");
        assert_eq!(relative_time(&at(3 * 3600), now), "3h ago");
        assert_eq!(relative_time(&at(2 * 86400 + 10), now), "2d ago");
        // Clock skew never yields a negative duration.
        assert_eq!(relative_time(&at(-30), now), "just now");
    }

    #[test]
    fn test_unparseable_passthrough() {
        assert_eq!(relative_time_from_now("sometime"), "sometime");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(99.994), 99.99);
    }
}
