//! Pure transitions over [`TimerClock`].
//!
//! Nothing here reads a clock or touches storage: every function takes the
//! instant it is evaluated at, so two clients holding the same record compute
//! the same value for the same instant.

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::Serialize;

use super::{
    error::{TimerError, TimerResult},
    state::{SeedTime, TimerClock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "op", content = "seed")]
pub enum Transition {
    Start,
    Pause,
    Reset,
    Seed(SeedTime),
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Pause => "pause",
            Transition::Reset => "reset",
            Transition::Seed(_) => "seed",
        }
    }
}

/// Years an RFC 3339 timestamp can hold.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

fn millis_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    (later - earlier).num_milliseconds()
}

impl TimerClock {
    /// Elapsed milliseconds as of `now`, clamped at zero.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let Some(start) = self.start_instant else {
            return 0;
        };

        let accumulated = i64::try_from(self.accumulated_paused_ms).unwrap_or(i64::MAX);
        let measured_to = match (self.is_running, self.paused_at_instant) {
            (false, Some(paused_at)) => paused_at,
            // Running, or stopped without a pause edge (freshly seeded): live.
            _ => now,
        };

        millis_between(measured_to, start)
            .saturating_sub(accumulated)
            .max(0) as u64
    }

    pub fn started(&self, now: DateTime<Utc>) -> TimerClock {
        let accumulated_paused_ms = match (self.start_instant, self.paused_at_instant) {
            (None, _) => 0,
            (Some(_), Some(paused_at)) => {
                let pause_ms = millis_between(now, paused_at).max(0) as u64;
                self.accumulated_paused_ms.saturating_add(pause_ms)
            }
            (Some(_), None) => self.accumulated_paused_ms,
        };

        TimerClock {
            start_instant: Some(self.start_instant.unwrap_or(now)),
            paused_at_instant: None,
            accumulated_paused_ms,
            is_running: true,
        }
    }

    /// Fails without touching the record when the timer is not running.
    pub fn paused(&self, now: DateTime<Utc>) -> TimerResult<TimerClock> {
        if !self.is_running {
            return Err(TimerError::InvalidTransition("timer not running".into()));
        }

        Ok(TimerClock {
            is_running: false,
            paused_at_instant: Some(now),
            ..*self
        })
    }

    pub fn reset(&self) -> TimerClock {
        TimerClock::new()
    }

    /// Back-dates the start so the timer reads exactly `seed` at `now`.
    ///
    /// A stopped timer freezes at the seeded value until the next start; a
    /// running timer keeps running from it.
    pub fn seeded(&self, seed: SeedTime, now: DateTime<Utc>) -> TimerResult<TimerClock> {
        let out_of_range =
            || TimerError::Validation(format!("seed time {seed} is too large to represent"));

        let target_ms = seed
            .as_millis()
            .and_then(|ms| i64::try_from(ms).ok())
            .ok_or_else(out_of_range)?;
        let start = TimeDelta::try_milliseconds(target_ms)
            .and_then(|delta| now.checked_sub_signed(delta))
            .filter(|start| STORABLE_YEARS.contains(&start.year()))
            .ok_or_else(out_of_range)?;

        Ok(TimerClock {
            start_instant: Some(start),
            paused_at_instant: (!self.is_running).then_some(now),
            accumulated_paused_ms: 0,
            is_running: self.is_running,
        })
    }

    pub fn apply(&self, transition: Transition, now: DateTime<Utc>) -> TimerResult<TimerClock> {
        match transition {
            Transition::Start => Ok(self.started(now)),
            Transition::Pause => self.paused(now),
            Transition::Reset => Ok(self.reset()),
            Transition::Seed(seed) => self.seeded(seed, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn seed(raw: &str) -> SeedTime {
        raw.parse().unwrap()
    }

    #[test]
    fn fresh_timer_reads_zero() {
        let clock = TimerClock::new();
        assert_eq!(clock.elapsed_ms(at(0)), 0);
        assert_eq!(clock.elapsed_ms(at(1_000_000)), 0);
    }

    #[test]
    fn start_pause_resume_scenario() {
        let clock = TimerClock::new().started(at(0));
        assert_eq!(clock.start_instant(), Some(at(0)));
        assert_eq!(clock.elapsed_ms(at(4_000)), 4_000);

        let clock = clock.paused(at(10_000)).unwrap();
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_ms(at(10_000)), 10_000);
        assert_eq!(clock.elapsed_ms(at(19_999)), 10_000);
        assert_eq!(clock.elapsed_ms(at(86_400_000)), 10_000);

        let clock = clock.started(at(20_000));
        assert_eq!(clock.accumulated_paused_ms(), 10_000);
        assert_eq!(clock.paused_at_instant(), None);
        assert_eq!(clock.elapsed_ms(at(25_000)), 15_000);
    }

    #[test]
    fn elapsed_counts_only_running_intervals() {
        let first_start = at(0);
        let first_pause = at(3_000);
        let second_start = at(8_000);
        let clock = TimerClock::new()
            .started(first_start)
            .paused(first_pause)
            .unwrap()
            .started(second_start);

        let now = at(12_500);
        let expected = millis_between(now, first_start) - millis_between(second_start, first_pause);
        assert_eq!(clock.elapsed_ms(now) as i64, expected);
        assert_eq!(expected, 7_500);
    }

    #[test]
    fn running_elapsed_is_monotonic() {
        let clock = TimerClock::new()
            .started(at(0))
            .paused(at(2_000))
            .unwrap()
            .started(at(5_000));

        let mut previous = 0;
        for ms in (0..60_000).step_by(750) {
            let elapsed = clock.elapsed_ms(at(ms));
            assert!(elapsed >= previous, "elapsed went backwards at {ms}");
            previous = elapsed;
        }
    }

    #[test]
    fn pausing_a_stopped_timer_is_rejected() {
        let idle = TimerClock::new();
        assert_eq!(
            idle.paused(at(0)),
            Err(TimerError::InvalidTransition("timer not running".into()))
        );

        let paused = idle.started(at(0)).paused(at(1_000)).unwrap();
        assert!(paused.paused(at(2_000)).is_err());
        assert_eq!(paused.paused_at_instant(), Some(at(1_000)));
    }

    #[test]
    fn starting_a_running_timer_changes_nothing() {
        let running = TimerClock::new().started(at(0));
        assert_eq!(running.started(at(9_000)), running);
    }

    #[test]
    fn reset_returns_to_idle() {
        let clock = TimerClock::new()
            .started(at(0))
            .paused(at(5_000))
            .unwrap()
            .reset();
        assert!(clock.is_idle());
        assert!(!clock.is_running());
        assert_eq!(clock.accumulated_paused_ms(), 0);
        for ms in [0, 5_000, 1_000_000] {
            assert_eq!(clock.elapsed_ms(at(ms)), 0);
        }
    }

    #[test]
    fn seeding_a_stopped_timer_freezes_at_the_seed() {
        let now = at(50_000);
        let clock = TimerClock::new().seeded(seed("01:30:00"), now).unwrap();
        assert!(!clock.is_running());
        assert_eq!(clock.paused_at_instant(), Some(now));
        assert_eq!(clock.elapsed_ms(now), 5_400_000);
        assert_eq!(clock.elapsed_ms(at(3_600_000)), 5_400_000);

        // Resuming continues from the seeded value.
        let resumed = clock.started(at(60_000));
        assert_eq!(resumed.accumulated_paused_ms(), 10_000);
        assert_eq!(resumed.elapsed_ms(at(61_000)), 5_401_000);
    }

    #[test]
    fn seeding_discards_earlier_pauses() {
        let clock = TimerClock::new()
            .started(at(0))
            .paused(at(1_000))
            .unwrap()
            .started(at(9_000))
            .paused(at(10_000))
            .unwrap();
        assert_eq!(clock.accumulated_paused_ms(), 8_000);

        let seeded = clock.seeded(seed("00:02:00"), at(20_000)).unwrap();
        assert_eq!(seeded.accumulated_paused_ms(), 0);
        assert_eq!(seeded.elapsed_ms(at(20_000)), 120_000);
    }

    #[test]
    fn seeding_a_running_timer_keeps_it_running_from_the_seed() {
        let running = TimerClock::new().started(at(0));
        let seeded = running.seeded(seed("25:00:00"), at(1_000)).unwrap();
        assert!(seeded.is_running());
        assert_eq!(seeded.paused_at_instant(), None);
        assert_eq!(seeded.elapsed_ms(at(1_000)), 90_000_000);
        assert_eq!(seeded.elapsed_ms(at(3_000)), 90_002_000);
    }

    #[test]
    fn unrepresentable_seed_is_a_validation_error() {
        let huge = SeedTime::new(u64::MAX / 3_600_000, 0, 0).unwrap();
        assert!(matches!(
            TimerClock::new().seeded(huge, at(0)),
            Err(TimerError::Validation(_))
        ));
    }

    #[test]
    fn seed_reaching_before_year_zero_is_rejected() {
        let now = at(0);
        let within = TimerClock::new().seeded(seed("17000000:00:00"), now).unwrap();
        assert!(within.start_instant().unwrap().year() >= 0);

        let paused = TimerClock::new().started(at(0)).paused(at(1_000)).unwrap();
        match paused.seeded(seed("20000000:00:00"), now) {
            Err(TimerError::Validation(message)) => {
                assert!(message.contains("too large"), "unexpected message: {message}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(paused.paused_at_instant(), Some(at(1_000)));
    }

    #[test]
    fn skewed_clocks_never_produce_negative_values() {
        let clock = TimerClock::new().started(at(10_000));
        assert_eq!(clock.elapsed_ms(at(0)), 0);

        // A resume stamped before the pause edge adds no paused time.
        let paused = clock.paused(at(20_000)).unwrap();
        let resumed = paused.started(at(15_000));
        assert_eq!(resumed.accumulated_paused_ms(), 0);
    }

    #[test]
    fn live_preview_without_pause_edge() {
        let start = at(0);
        let clock = TimerClock::from_parts(Some(start), None, 1_000, false).unwrap();
        assert_eq!(clock.elapsed_ms(at(5_000)), 4_000);
        assert_eq!(clock.started(at(5_000)).accumulated_paused_ms(), 1_000);
    }

    #[test]
    fn apply_dispatches_each_transition() {
        let clock = TimerClock::new();
        let started = clock.apply(Transition::Start, at(0)).unwrap();
        assert!(started.is_running());
        let paused = started.apply(Transition::Pause, at(1_000)).unwrap();
        assert!(!paused.is_running());
        let seeded = paused.apply(Transition::Seed(seed("00:00:30")), at(2_000)).unwrap();
        assert_eq!(seeded.elapsed_ms(at(2_000)), 30_000);
        assert!(seeded.apply(Transition::Reset, at(3_000)).unwrap().is_idle());
        assert_eq!(Transition::Seed(seed("00:00:30")).as_str(), "seed");
    }
}
