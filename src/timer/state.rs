use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::{TimerError, TimerResult};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// The persisted temporal fields of a timer.
///
/// Elapsed time is never stored. It is derived from these fields and a query
/// instant, see [`TimerClock::elapsed_ms`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerClock {
    pub(super) start_instant: Option<DateTime<Utc>>,
    /// Set only while paused with a known pause edge; cleared on resume.
    pub(super) paused_at_instant: Option<DateTime<Utc>>,
    /// Paused time from completed pauses, excluding one in progress.
    pub(super) accumulated_paused_ms: u64,
    pub(super) is_running: bool,
}

impl TimerClock {
    /// A never-started timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a clock from stored columns, rejecting shapes no transition
    /// can produce.
    pub fn from_parts(
        start_instant: Option<DateTime<Utc>>,
        paused_at_instant: Option<DateTime<Utc>>,
        accumulated_paused_ms: u64,
        is_running: bool,
    ) -> TimerResult<Self> {
        if is_running && paused_at_instant.is_some() {
            return Err(TimerError::Validation(
                "a running timer cannot carry a pause instant".into(),
            ));
        }
        if start_instant.is_none()
            && (is_running || paused_at_instant.is_some() || accumulated_paused_ms != 0)
        {
            return Err(TimerError::Validation(
                "a timer without a start instant must be idle with no paused time".into(),
            ));
        }

        Ok(Self {
            start_instant,
            paused_at_instant,
            accumulated_paused_ms,
            is_running,
        })
    }

    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start_instant
    }

    pub fn paused_at_instant(&self) -> Option<DateTime<Utc>> {
        self.paused_at_instant
    }

    pub fn accumulated_paused_ms(&self) -> u64 {
        self.accumulated_paused_ms
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_idle(&self) -> bool {
        self.start_instant.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimerName(String);

impl TimerName {
    pub fn parse(raw: &str) -> TimerResult<Self> {
        non_blank(raw, "timer name").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TimerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trimmed user name; case is kept as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    pub fn parse(raw: &str) -> TimerResult<Self> {
        non_blank(raw, "user name").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn non_blank(raw: &str, what: &str) -> TimerResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimerError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// An operator-chosen initial duration. Hours are unbounded; minutes and
/// seconds stay within `0..=59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedTime {
    hours: u64,
    minutes: u8,
    seconds: u8,
}

impl SeedTime {
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> TimerResult<Self> {
        if minutes > 59 {
            return Err(TimerError::Validation(format!(
                "minutes must be between 0 and 59, got {minutes}"
            )));
        }
        if seconds > 59 {
            return Err(TimerError::Validation(format!(
                "seconds must be between 0 and 59, got {seconds}"
            )));
        }

        Ok(Self {
            hours,
            minutes: minutes as u8,
            seconds: seconds as u8,
        })
    }

    pub fn hours(&self) -> u64 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    /// `None` when the hour count overflows a millisecond count.
    pub fn as_millis(&self) -> Option<u64> {
        self.hours
            .checked_mul(MS_PER_HOUR)?
            .checked_add(u64::from(self.minutes) * MS_PER_MINUTE)?
            .checked_add(u64::from(self.seconds) * MS_PER_SECOND)
    }
}

impl FromStr for SeedTime {
    type Err = TimerError;

    /// Accepts `H:MM:SS`, or `H:MM` with seconds defaulting to zero.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TimerError::Validation("seed time must not be empty".into()));
        }

        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(TimerError::Validation(format!(
                "seed time '{raw}' must look like HH:MM:SS or HH:MM"
            )));
        }

        let hours = parse_field(parts[0], "hours", raw)?;
        let minutes = parse_field(parts[1], "minutes", raw)?;
        let seconds = match parts.get(2) {
            Some(part) => parse_field(part, "seconds", raw)?,
            None => 0,
        };

        SeedTime::new(hours, minutes, seconds)
    }
}

fn parse_field(part: &str, field: &str, raw: &str) -> TimerResult<u64> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimerError::Validation(format!(
            "{field} in seed time '{raw}' must be a non-negative whole number"
        )));
    }
    part.parse::<u64>().map_err(|_| {
        TimerError::Validation(format!("{field} in seed time '{raw}' is too large"))
    })
}

impl fmt::Display for SeedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Renders elapsed milliseconds as `HH:MM:SS`. Hours do not wrap at 24.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / MS_PER_SECOND;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use yare::parameterized;

    #[parameterized(
        full = { "01:30:00", 1, 30, 0 },
        hours_past_a_day = { "25:00:00", 25, 0, 0 },
        single_digit_hour = { "1:05:09", 1, 5, 9 },
        two_part = { "02:15", 2, 15, 0 },
        padded_whitespace = { "  00:00:59 ", 0, 0, 59 },
        many_hours = { "1000:59:59", 1000, 59, 59 },
    )]
    fn parses_valid_seed_times(raw: &str, hours: u64, minutes: u8, seconds: u8) {
        let seed: SeedTime = raw.parse().unwrap();
        assert_eq!(seed.hours(), hours);
        assert_eq!(seed.minutes(), minutes);
        assert_eq!(seed.seconds(), seconds);
    }

    #[parameterized(
        seconds_out_of_range = { "00:00:61", "seconds must be between 0 and 59" },
        minutes_out_of_range = { "00:60:00", "minutes must be between 0 and 59" },
        negative_hours = { "-1:00:00", "hours in seed time" },
        letters = { "aa:00:00", "hours in seed time" },
        empty_field = { "01::00", "minutes in seed time" },
        single_part = { "90", "must look like HH:MM:SS" },
        too_many_parts = { "1:2:3:4", "must look like HH:MM:SS" },
        blank = { "   ", "must not be empty" },
    )]
    fn rejects_malformed_seed_times(raw: &str, expected: &str) {
        match raw.parse::<SeedTime>() {
            Err(TimerError::Validation(message)) => {
                assert!(message.contains(expected), "unexpected message: {message}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn seed_time_converts_to_millis() {
        let seed: SeedTime = "01:30:00".parse().unwrap();
        assert_eq!(seed.as_millis(), Some(5_400_000));
        assert_eq!(seed.to_string(), "01:30:00");
    }

    #[test]
    fn absurd_hour_counts_do_not_overflow() {
        let seed = SeedTime::new(u64::MAX, 0, 0).unwrap();
        assert_eq!(seed.as_millis(), None);
    }

    #[test]
    fn names_are_trimmed_and_must_not_be_blank() {
        assert_eq!(TimerName::parse("  focus  ").unwrap().as_str(), "focus");
        assert!(matches!(
            TimerName::parse(" \t "),
            Err(TimerError::Validation(_))
        ));
        assert_eq!(UserName::parse(" Alice ").unwrap().as_str(), "Alice");
        assert!(matches!(UserName::parse(""), Err(TimerError::Validation(_))));
    }

    #[test]
    fn stored_shapes_are_checked() {
        let at = Utc.timestamp_millis_opt(1_000).unwrap();
        assert!(TimerClock::from_parts(Some(at), Some(at), 0, true).is_err());
        assert!(TimerClock::from_parts(None, None, 5, false).is_err());
        assert!(TimerClock::from_parts(None, None, 0, true).is_err());
        assert!(TimerClock::from_parts(Some(at), Some(at), 10, false).is_ok());
        assert_eq!(TimerClock::from_parts(None, None, 0, false).unwrap(), TimerClock::new());
    }

    #[test]
    fn elapsed_is_formatted_without_wrapping_hours() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(5_400_999), "01:30:00");
        assert_eq!(format_elapsed(90_000_000), "25:00:00");
    }
}
