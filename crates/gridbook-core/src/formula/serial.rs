//! 1900-date-system serial numbers.
//!
//! A serial is a count of days since 1899-12-30. Serial 60 is the phantom
//! 1900-02-29 from the original Lotus leap-year bug; conversions preserve
//! it by skipping one day on either side of the gap and never panic on it.

use chrono::{Duration, NaiveDate};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch")
}

/// Convert a calendar date to its serial number.
pub fn date_to_serial(date: NaiveDate) -> f64 {
    let days = (date - epoch()).num_days();
    if days >= 60 {
        (days + 1) as f64
    } else {
        days as f64
    }
}

/// Convert a serial number back to a calendar date.
///
/// Serial 60 (the phantom leap day) maps to 1900-02-28; out-of-range
/// serials yield `None` rather than panicking.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() as i64;
    let adjusted = if days >= 60 { days - 1 } else { days };
    epoch().checked_add_signed(Duration::try_days(adjusted)?)
}

/// The time-of-day fraction of a serial, as (hour, minute, second).
pub fn serial_time_parts(serial: f64) -> (u32, u32, u32) {
    let fraction = serial.fract().abs();
    let total_seconds = (fraction * 86_400.0).round() as u64 % 86_400;
    (
        (total_seconds / 3600) as u32,
        ((total_seconds % 3600) / 60) as u32,
        (total_seconds % 60) as u32,
    )
}

/// Build a serial from year/month/day with spreadsheet normalization:
/// years 0..=99 map into 1900..=1999, months overflow and underflow into
/// adjacent years, and day offsets roll through month boundaries.
pub fn ymd_to_serial(year: i64, month: i64, day: i64) -> Option<f64> {
    let year = if (0..=99).contains(&year) {
        year + 1900
    } else {
        year
    };

    let total_months = year * 12 + (month - 1);
    let norm_year = total_months.div_euclid(12);
    let norm_month = (total_months.rem_euclid(12) + 1) as u32;

    let year32 = i32::try_from(norm_year).ok()?;
    let first = NaiveDate::from_ymd_opt(year32, norm_month, 1)?;
    let date = first.checked_add_signed(Duration::try_days(day - 1)?)?;
    Some(date_to_serial(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_first_serials() {
        let jan1 = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        assert_eq!(date_to_serial(jan1), 1.0);
        assert_eq!(serial_to_date(1.0).unwrap(), jan1);
    }

    #[test]
    fn test_leap_bug_boundary() {
        // DATE(1900,2,28) -> 59, DATE(1900,3,1) -> 61; serial 60 is the
        // phantom leap day.
        assert_eq!(ymd_to_serial(1900, 2, 28), Some(59.0));
        assert_eq!(ymd_to_serial(1900, 3, 1), Some(61.0));
        assert_eq!(
            serial_to_date(59.0).unwrap(),
            NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()
        );
        assert_eq!(
            serial_to_date(61.0).unwrap(),
            NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()
        );
        // The phantom day itself round-trips without panicking.
        assert_eq!(
            serial_to_date(60.0).unwrap(),
            NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_modern_serial() {
        // A well-known anchor: 2024-01-01 is serial 45292.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_to_serial(date), 45292.0);
        assert_eq!(serial_to_date(45292.0).unwrap(), date);
        assert_eq!(ymd_to_serial(2024, 1, 1), Some(45292.0));
    }

    #[test]
    fn test_two_digit_years_map_to_1900s() {
        assert_eq!(ymd_to_serial(24, 1, 1), ymd_to_serial(1924, 1, 1));
        assert_eq!(ymd_to_serial(0, 1, 1), ymd_to_serial(1900, 1, 1));
    }

    #[test]
    fn test_month_overflow_normalizes() {
        // Month 13 rolls into January of the next year.
        assert_eq!(ymd_to_serial(2023, 13, 1), ymd_to_serial(2024, 1, 1));
        // Month 0 rolls back into December of the previous year.
        assert_eq!(ymd_to_serial(2024, 0, 15), ymd_to_serial(2023, 12, 15));
        // Day 0 rolls back to the last day of the previous month.
        assert_eq!(ymd_to_serial(2024, 3, 0), ymd_to_serial(2024, 2, 29));
        // Day overflow rolls forward.
        assert_eq!(ymd_to_serial(2024, 1, 32), ymd_to_serial(2024, 2, 1));
    }

    #[test]
    fn test_serial_roundtrip_preserves_ymd() {
        for (y, m, d) in [(1900, 1, 1), (1999, 12, 31), (2024, 2, 29), (2100, 6, 15)] {
            let serial = ymd_to_serial(y, m, d).unwrap();
            let date = serial_to_date(serial).unwrap();
            assert_eq!((date.year() as i64, date.month() as i64, date.day() as i64), (y, m, d));
        }
    }

    #[test]
    fn test_time_fraction() {
        assert_eq!(serial_time_parts(45292.5), (12, 0, 0));
        assert_eq!(serial_time_parts(45292.75), (18, 0, 0));
        assert_eq!(serial_time_parts(0.25), (6, 0, 0));
    }

    #[test]
    fn test_out_of_range_serial_is_none() {
        assert!(serial_to_date(f64::NAN).is_none());
        assert!(serial_to_date(f64::INFINITY).is_none());
        assert!(serial_to_date(1.0e18).is_none());
    }
}
