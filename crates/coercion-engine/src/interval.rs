//! ISO 8601 interval parsing with resolution expansion.
//!
//! An interval string takes one of three forms: `<datetime>/<duration>`,
//! `<datetime>/<datetime>`, or a bare `<datetime>` whose precision implies
//! its width (a date spans one day, an hour token one hour, and so on).
//! Every produced endpoint is normalized to UTC, whatever offset the input
//! carried.
//!
//! Two domain policies apply on top of the grammar: years before 2000 are
//! rejected, and fractional seconds are accepted only when the fraction is
//! all zeros — one second is the smallest supported resolution. Each policy
//! has its own diagnostic; anything else malformed gets the generic one.

use std::fmt;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use serde::Serialize;

use crate::duration::CalendarDuration;
use crate::error::{CoercionError, Result};

// ── Public types ────────────────────────────────────────────────────────────

/// A UTC-normalized span of time with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    /// Inclusive start of the span.
    pub start: DateTime<Utc>,
    /// End of the span, never before `start`.
    pub end: DateTime<Utc>,
}

impl Interval {
    /// The exact width of the span.
    pub fn width(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Renders the canonical `start/end` form in whole-second RFC 3339, which
/// [`parse_interval`] accepts back unchanged.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

/// The finest unit explicitly present in a datetime token.
///
/// Fixes the width a bare datetime expands to: a date-only token spans one
/// day, `..T12` one hour, `..T12:30` one minute, `..T12:30:45` one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Day,
    Hour,
    Minute,
    Second,
}

// ── parse_interval ──────────────────────────────────────────────────────────

/// A datetime token with its offset and precision still attached.
struct DatetimeToken {
    local: NaiveDateTime,
    offset: FixedOffset,
    resolution: Resolution,
    whole_seconds: bool,
}

/// What follows the `/` separator, if anything.
enum Tail {
    Expand,
    Duration(CalendarDuration),
    End(DatetimeToken),
}

/// Parse an ISO 8601 interval string into a UTC `(start, end)` pair.
///
/// # Grammar
///
/// * `<datetime>/<duration>` — ends at `start + duration`, applied with
///   calendar arithmetic (see [`CalendarDuration::add_to`]).
/// * `<datetime>/<datetime>` — the explicit pair, reordered if given
///   end-first so that `start <= end` always holds.
/// * `<datetime>` — expanded to a span of one unit of the token's finest
///   specified resolution.
///
/// A `<datetime>` is `YYYY-MM-DD`, optionally followed by `T` and a time of
/// hour, minute, or second precision, optionally followed by `Z` or a
/// `+HH:MM` / `-HH:MM` offset. A missing offset means UTC; a missing time
/// means midnight (and day-width expansion).
///
/// # Errors
///
/// * [`CoercionError::YearTooEarly`] when the normalized interval starts
///   before the year 2000.
/// * [`CoercionError::SubsecondResolution`] when a fractional-second field
///   carries a nonzero value.
/// * [`CoercionError::MalformedInterval`] for anything else the grammar
///   rejects, including out-of-range arithmetic.
///
/// # Examples
///
/// ```
/// use coercion_engine::parse_interval;
///
/// let interval = parse_interval("2013-01-01T17:00-05:00/P2W").unwrap();
/// assert_eq!(interval.start.to_rfc3339(), "2013-01-01T22:00:00+00:00");
/// assert_eq!(interval.end.to_rfc3339(), "2013-01-15T22:00:00+00:00");
///
/// let day = parse_interval("2013-01-01").unwrap();
/// assert_eq!(day.width(), chrono::Duration::days(1));
/// ```
pub fn parse_interval(value: &str) -> Result<Interval> {
    let malformed = || CoercionError::MalformedInterval(value.to_owned());

    let (start_raw, tail_raw) = match value.split_once('/') {
        Some((start, tail)) => (start, Some(tail)),
        None => (value, None),
    };

    let start_tok = parse_datetime_token(start_raw).ok_or_else(malformed)?;
    let tail = match tail_raw {
        None => Tail::Expand,
        Some(tail_raw) => match CalendarDuration::parse(tail_raw) {
            Some(duration) => Tail::Duration(duration),
            None => Tail::End(parse_datetime_token(tail_raw).ok_or_else(malformed)?),
        },
    };

    // Semantic checks run only once the whole input is syntactically
    // recognized, so malformed strings always get the generic diagnostic.
    let end_whole = match &tail {
        Tail::End(end_tok) => end_tok.whole_seconds,
        _ => true,
    };
    if !(start_tok.whole_seconds && end_whole) {
        return Err(CoercionError::SubsecondResolution(value.to_owned()));
    }

    let start = to_utc(&start_tok).ok_or_else(malformed)?;
    let (start, end) = match tail {
        Tail::Expand => {
            let end = expand(start, start_tok.resolution).ok_or_else(malformed)?;
            (start, end)
        }
        Tail::Duration(duration) => {
            let end = duration.add_to(start).ok_or_else(malformed)?;
            (start, end)
        }
        Tail::End(end_tok) => {
            let end = to_utc(&end_tok).ok_or_else(malformed)?;
            if end < start {
                (end, start)
            } else {
                (start, end)
            }
        }
    };

    // start is the minimum of the pair, so one check covers the interval.
    if start.year() < 2000 {
        return Err(CoercionError::YearTooEarly(value.to_owned()));
    }

    Ok(Interval { start, end })
}

// ── Token parsing ───────────────────────────────────────────────────────────

fn parse_datetime_token(token: &str) -> Option<DatetimeToken> {
    match token.split_once('T') {
        None => {
            let date = parse_date_part(token)?;
            Some(DatetimeToken {
                local: date.and_hms_opt(0, 0, 0)?,
                offset: Utc.fix(),
                resolution: Resolution::Day,
                whole_seconds: true,
            })
        }
        Some((date_part, time_part)) => {
            let date = parse_date_part(date_part)?;
            let (clock, offset) = split_offset(time_part)?;
            let (time, resolution, whole_seconds) = parse_clock(clock)?;
            Some(DatetimeToken {
                local: date.and_time(time),
                offset,
                resolution,
                whole_seconds,
            })
        }
    }
}

/// Strict `YYYY-MM-DD`; chrono alone would tolerate unpadded fields.
fn parse_date_part(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Split the trailing `Z` / `+HH:MM` / `-HH:MM` off a time field. A missing
/// offset means UTC.
fn split_offset(time: &str) -> Option<(&str, FixedOffset)> {
    if let Some(clock) = time.strip_suffix('Z') {
        return Some((clock, Utc.fix()));
    }
    match time.find(['+', '-']) {
        Some(idx) => {
            let (clock, tail) = time.split_at(idx);
            let east = tail.starts_with('+');
            let offset = parse_offset(&tail[1..], east)?;
            Some((clock, offset))
        }
        None => Some((time, Utc.fix())),
    }
}

fn parse_offset(s: &str, east: bool) -> Option<FixedOffset> {
    let (hh, mm) = s.split_once(':')?;
    let hours = two_digits(hh)?;
    let minutes = two_digits(mm)?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = (hours * 3600 + minutes * 60) as i32;
    if east {
        FixedOffset::east_opt(seconds)
    } else {
        FixedOffset::west_opt(seconds)
    }
}

/// Parse `HH`, `HH:MM`, or `HH:MM:SS[.frac]`, reporting the resolution and
/// whether the fractional field (if any) is all zeros.
fn parse_clock(clock: &str) -> Option<(NaiveTime, Resolution, bool)> {
    let (clock, fraction) = match clock.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (clock, None),
    };
    if let Some(frac) = fraction {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let fields: Vec<&str> = clock.split(':').collect();
    let (time, resolution) = match fields.as_slice() {
        [h] => (
            NaiveTime::from_hms_opt(two_digits(h)?, 0, 0)?,
            Resolution::Hour,
        ),
        [h, m] => (
            NaiveTime::from_hms_opt(two_digits(h)?, two_digits(m)?, 0)?,
            Resolution::Minute,
        ),
        [h, m, s] => (
            NaiveTime::from_hms_opt(two_digits(h)?, two_digits(m)?, two_digits(s)?)?,
            Resolution::Second,
        ),
        _ => return None,
    };

    // A fraction is only meaningful on the seconds field.
    if fraction.is_some() && resolution != Resolution::Second {
        return None;
    }
    let whole_seconds = fraction.map_or(true, |f| f.bytes().all(|b| b == b'0'));

    Some((time, resolution, whole_seconds))
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

// ── Normalization and expansion ─────────────────────────────────────────────

fn to_utc(tok: &DatetimeToken) -> Option<DateTime<Utc>> {
    tok.offset
        .from_local_datetime(&tok.local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Widen a bare datetime into a span of one unit of its resolution.
fn expand(start: DateTime<Utc>, resolution: Resolution) -> Option<DateTime<Utc>> {
    let width = match resolution {
        Resolution::Day => chrono::Duration::days(1),
        Resolution::Hour => chrono::Duration::hours(1),
        Resolution::Minute => chrono::Duration::minutes(1),
        Resolution::Second => chrono::Duration::seconds(1),
    };
    start.checked_add_signed(width)
}

// ── Tests ───────────────────────────────────────────────────────────────────
