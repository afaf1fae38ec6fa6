//! Time conversions between stored UTC instants and backend representations.
//!
//! Appointments are stored in UTC. Backends expect either a date-only value
//! (all-day events) or a timestamp carrying the local offset that applies at
//! the moment of conversion.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Date format used by backends for date-only values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts a UTC instant to a timestamp with the given zone's offset.
pub fn with_offset_in<Tz: TimeZone>(dt: DateTime<Utc>, tz: &Tz) -> DateTime<FixedOffset> {
    dt.with_timezone(tz).fixed_offset()
}

/// Converts a UTC instant to a timestamp with the local offset.
pub fn with_local_offset(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    with_offset_in(dt, &Local)
}

/// Returns the calendar date of `dt` in the given zone.
pub fn date_in<Tz: TimeZone>(dt: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    dt.with_timezone(tz).date_naive()
}

/// Returns the local calendar date of `dt`, formatted as `YYYY-MM-DD`.
pub fn local_date_string(dt: DateTime<Utc>) -> String {
    date_in(dt, &Local).format(DATE_FORMAT).to_string()
}

/// Returns midnight of `date` in the given zone, as a UTC instant.
///
/// When midnight does not exist (a DST gap at 00:00), the earliest valid
/// instant of that day is used; if none is found the date is read as UTC.
pub fn midnight_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => (1..=3)
            .filter_map(|h| {
                tz.from_local_datetime(&(naive + chrono::Duration::hours(h)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .next()
            .unwrap_or_else(|| naive.and_utc()),
    }
}

/// Returns local midnight of `date` as a UTC instant.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    midnight_in(date, &Local)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn offset_conversion_keeps_instant() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let converted = with_offset_in(utc(2024, 3, 15, 10, 0), &tz);
        assert_eq!(converted.to_rfc3339(), "2024-03-15T12:00:00+02:00");
        assert_eq!(converted.with_timezone(&Utc), utc(2024, 3, 15, 10, 0));
    }

    #[test]
    fn date_in_zone_can_cross_midnight() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let date = date_in(utc(2024, 3, 15, 2, 0), &tz);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }

    #[test]
    fn midnight_in_fixed_zone() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(midnight_in(date, &tz), utc(2024, 3, 14, 23, 0));
    }

    #[test]
    fn parse_date_formats() {
        assert_eq!(
            parse_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert!(parse_date("15/03/2024").is_none());
    }

    #[test]
    fn local_date_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let midnight = local_midnight(date);
        assert_eq!(local_date_string(midnight), "2024-07-01");
    }
}
