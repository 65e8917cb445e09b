//! ISO 8601 durations with calendar-aware application.
//!
//! A duration like `P1Y2M3DT4H5M6S` is not a fixed number of seconds: adding
//! a month to January 31 must land inside February, and adding a year to a
//! leap day must land on a real date. [`CalendarDuration::add_to`] applies
//! the calendar components explicitly instead of delegating to a fixed-width
//! arithmetic shortcut.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// The components of an ISO 8601 duration (`PnYnMnWnDTnHnMnS`).
///
/// All components are non-negative; reversed intervals are handled at the
/// interval layer, not by negative durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarDuration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl CalendarDuration {
    /// Parse an ISO 8601 duration string.
    ///
    /// Accepts `P[nY][nM][nW][nD][T[nH][nM][nS]]` with integer components in
    /// strictly that order and at least one component present (`P` and `PT`
    /// alone are rejected, as is a `T` with nothing after it).
    ///
    /// Returns `None` if the string is not a valid duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use coercion_engine::CalendarDuration;
    ///
    /// let d = CalendarDuration::parse("P1Y2M3DT4H5M6S").unwrap();
    /// assert_eq!(d.years, 1);
    /// assert_eq!(d.seconds, 6);
    /// assert!(CalendarDuration::parse("P1D2H").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('P')?;

        let mut out = CalendarDuration::default();
        let mut in_time = false;
        let mut last_rank = 0u8;
        let mut num_buf = String::new();
        let mut found_any = false;

        for ch in rest.chars() {
            if ch.is_ascii_digit() {
                num_buf.push(ch);
                continue;
            }
            if ch == 'T' {
                // The date/time separator may appear once, between components.
                if in_time || !num_buf.is_empty() {
                    return None;
                }
                in_time = true;
                continue;
            }
            if num_buf.is_empty() {
                return None;
            }
            let n: u32 = num_buf.parse().ok()?;
            num_buf.clear();

            let rank = match (in_time, ch) {
                (false, 'Y') => {
                    out.years = n;
                    1
                }
                (false, 'M') => {
                    out.months = n;
                    2
                }
                (false, 'W') => {
                    out.weeks = n;
                    3
                }
                (false, 'D') => {
                    out.days = n;
                    4
                }
                (true, 'H') => {
                    out.hours = n;
                    5
                }
                (true, 'M') => {
                    out.minutes = n;
                    6
                }
                (true, 'S') => {
                    out.seconds = n;
                    7
                }
                _ => return None,
            };
            if rank <= last_rank {
                return None;
            }
            last_rank = rank;
            found_any = true;
        }

        // Trailing number without a unit, no components at all, or a dangling T.
        if !num_buf.is_empty() || !found_any {
            return None;
        }
        if in_time && last_rank < 5 {
            return None;
        }

        Some(out)
    }

    /// Add this duration to a UTC instant using calendar arithmetic.
    ///
    /// Components are applied coarsest-first: years and months shift the
    /// calendar date (clamping to the end of the target month when the
    /// day-of-month does not exist there, so Jan 31 + P1M lands on the last
    /// day of February), then weeks and days, then the time-of-day
    /// components as fixed-length seconds.
    ///
    /// Returns `None` if the result falls outside the representable range.
    pub fn add_to(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = i64::from(self.years) * 12 + i64::from(self.months);
        let date = shift_months(start.date_naive(), months)?;
        let date = date.checked_add_signed(chrono::Duration::days(
            i64::from(self.weeks) * 7 + i64::from(self.days),
        ))?;

        let seconds = i64::from(self.hours) * 3600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);
        let shifted = date
            .and_time(start.time())
            .checked_add_signed(chrono::Duration::seconds(seconds))?;

        Some(Utc.from_utc_datetime(&shifted))
    }
}

/// Shift a date by a whole number of months, clamping the day-of-month to
/// the length of the target month.
fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let total = i64::from(date.year()) * 12 + i64::from(date.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = (total.rem_euclid(12) + 1) as u32;

    NaiveDate::from_ymd_opt(year, month, date.day()).or_else(|| last_day_of_month(year, month))
}

/// The last day of a month is the day before the first of the following month.
fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    // ── parse tests ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_full_duration() {
        let d = CalendarDuration::parse("P1Y2M3DT4H5M6S").unwrap();
        assert_eq!(
            d,
            CalendarDuration {
                years: 1,
                months: 2,
                weeks: 0,
                days: 3,
                hours: 4,
                minutes: 5,
                seconds: 6,
            }
        );
    }

    #[test]
    fn test_parse_weeks() {
        let d = CalendarDuration::parse("P2W").unwrap();
        assert_eq!(d.weeks, 2);
        assert_eq!(d.days, 0);
    }

    #[test]
    fn test_parse_time_only() {
        let d = CalendarDuration::parse("PT90S").unwrap();
        assert_eq!(d.seconds, 90);
    }

    #[test]
    fn test_parse_multi_digit_components() {
        let d = CalendarDuration::parse("P10DT25H").unwrap();
        assert_eq!(d.days, 10);
        assert_eq!(d.hours, 25);
    }

    #[test]
    fn test_parse_month_vs_minute_disambiguation() {
        let d = CalendarDuration::parse("P1MT1M").unwrap();
        assert_eq!(d.months, 1);
        assert_eq!(d.minutes, 1);
    }

    #[test]
    fn test_parse_rejects_empty_and_bare_designators() {
        assert!(CalendarDuration::parse("").is_none());
        assert!(CalendarDuration::parse("P").is_none());
        assert!(CalendarDuration::parse("PT").is_none());
        assert!(CalendarDuration::parse("P1DT").is_none());
    }

    #[test]
    fn test_parse_rejects_time_unit_without_separator() {
        assert!(CalendarDuration::parse("P2H").is_none());
        assert!(CalendarDuration::parse("P1D2H").is_none());
    }

    #[test]
    fn test_parse_rejects_out_of_order_components() {
        assert!(CalendarDuration::parse("P1M2Y").is_none());
        assert!(CalendarDuration::parse("PT5M10H").is_none());
        assert!(CalendarDuration::parse("P1D1D").is_none());
    }

    #[test]
    fn test_parse_rejects_trailing_number() {
        assert!(CalendarDuration::parse("P1D2").is_none());
    }

    #[test]
    fn test_parse_rejects_missing_number() {
        assert!(CalendarDuration::parse("PD").is_none());
        assert!(CalendarDuration::parse("P1YM").is_none());
    }

    // ── add_to tests ────────────────────────────────────────────────────

    #[test]
    fn test_add_days_and_time() {
        let d = CalendarDuration::parse("P3DT4H5M6S").unwrap();
        let end = d.add_to(utc(2013, 1, 1, 12, 30, 0)).unwrap();
        assert_eq!(end, utc(2013, 1, 4, 16, 35, 6));
    }

    #[test]
    fn test_add_year_then_month_then_day() {
        let d = CalendarDuration::parse("P1Y2M3D").unwrap();
        let end = d.add_to(utc(2013, 1, 1, 12, 30, 0)).unwrap();
        assert_eq!(end, utc(2014, 3, 4, 12, 30, 0));
    }

    #[test]
    fn test_add_month_preserves_day() {
        let d = CalendarDuration::parse("P1M").unwrap();
        let end = d.add_to(utc(2013, 1, 15, 9, 0, 0)).unwrap();
        assert_eq!(end, utc(2013, 2, 15, 9, 0, 0));
    }

    #[test]
    fn test_add_month_clamps_to_end_of_february() {
        let d = CalendarDuration::parse("P1M").unwrap();
        let end = d.add_to(utc(2013, 1, 31, 0, 0, 0)).unwrap();
        assert_eq!(end, utc(2013, 2, 28, 0, 0, 0));
    }

    #[test]
    fn test_add_month_clamps_to_leap_day() {
        let d = CalendarDuration::parse("P1M").unwrap();
        let end = d.add_to(utc(2020, 1, 31, 0, 0, 0)).unwrap();
        assert_eq!(end, utc(2020, 2, 29, 0, 0, 0));
    }

    #[test]
    fn test_add_year_to_leap_day_clamps() {
        let d = CalendarDuration::parse("P1Y").unwrap();
        let end = d.add_to(utc(2020, 2, 29, 12, 0, 0)).unwrap();
        assert_eq!(end, utc(2021, 2, 28, 12, 0, 0));
    }

    #[test]
    fn test_add_months_across_year_boundary() {
        let d = CalendarDuration::parse("P14M").unwrap();
        let end = d.add_to(utc(2013, 11, 30, 0, 0, 0)).unwrap();
        assert_eq!(end, utc(2015, 1, 30, 0, 0, 0));
    }

    #[test]
    fn test_add_weeks_fixed_length() {
        let d = CalendarDuration::parse("P2W").unwrap();
        let end = d.add_to(utc(2013, 1, 1, 22, 0, 0)).unwrap();
        assert_eq!(end, utc(2013, 1, 15, 22, 0, 0));
    }

    #[test]
    fn test_add_time_rolls_over_midnight() {
        let d = CalendarDuration::parse("PT25H").unwrap();
        let end = d.add_to(utc(2013, 6, 30, 23, 30, 0)).unwrap();
        assert_eq!(end, utc(2013, 7, 2, 0, 30, 0));
    }

    #[test]
    fn test_shift_months_clamps_thirty_day_month() {
        assert_eq!(
            shift_months(NaiveDate::from_ymd_opt(2013, 3, 31).unwrap(), 1),
            NaiveDate::from_ymd_opt(2013, 4, 30)
        );
    }
}
