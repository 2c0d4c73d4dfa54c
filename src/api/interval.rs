//! ISO-8601 `duration` query values understood by the historical-data endpoints.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

pub const METER_WINDOW_HOURS: i64 = 6;

/// `num_days * 24` hours starting at 23:00 of the day of `start`, e.g.
/// `2026-01-18T23:00:00Z/PT168H`.
///
/// `start` is read as UTC, so the anchor day is the UTC date. Shortly after local midnight east
/// of UTC this is still the previous day.
pub fn hourly(start: NaiveDateTime, num_days: u32) -> String {
    let anchor = start.date().and_hms_opt(23, 0, 0).unwrap_or(start);
    let hours = u64::from(num_days) * 24;

    format!("{}Z/PT{}H", anchor.format("%Y-%m-%dT%H:%M:%S"), hours)
}

/// Trailing window ending at `now` (UTC), millisecond precision, e.g.
/// `2026-01-18T08:55:11.896Z/PT6H`.
pub fn meter(now: DateTime<Utc>) -> String {
    let start = now - Duration::hours(METER_WINDOW_HOURS);

    format!(
        "{}/PT{}H",
        start.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        METER_WINDOW_HOURS
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn hourly_week() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 18)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!("2026-01-18T23:00:00Z/PT168H", hourly(start, 7));
    }

    #[test]
    fn hourly_single_day_ignores_time_of_day() {
        let start = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap();
        assert_eq!("2025-12-31T23:00:00Z/PT24H", hourly(start, 1));
    }

    #[test]
    fn meter_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 18, 14, 55, 11).unwrap()
            + Duration::milliseconds(896);
        assert_eq!("2026-01-18T08:55:11.896Z/PT6H", meter(now));
    }

    #[test]
    fn meter_window_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 2, 0, 0).unwrap();
        assert_eq!("2026-02-28T20:00:00.000Z/PT6H", meter(now));
    }

    #[test]
    fn meter_window_starts_six_hours_before_now() {
        let now = Utc::now();
        let duration = meter(now);
        let (start, suffix) = duration.split_once('/').unwrap();
        assert_eq!("PT6H", suffix);
        assert!(start.ends_with('Z'));
        assert_eq!(Some('.'), start.chars().nth(19));
        assert_eq!(24, start.len());

        let parsed = DateTime::parse_from_rfc3339(start).unwrap();
        let expected = now - Duration::hours(6);
        assert_eq!(
            expected.timestamp_millis(),
            parsed.with_timezone(&Utc).timestamp_millis()
        );
    }
}
