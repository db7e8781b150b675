use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of operation instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock truncated to whole milliseconds, the precision instants are
/// stored with.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = instant;
    }

    pub fn advance_ms(&self, ms: i64) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) =
            TimeDelta::try_milliseconds(ms).and_then(|d| guard.checked_add_signed(d))
        {
            *guard = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn system_clock_has_millisecond_precision() {
        let now = SystemClock.now();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let start = Utc.timestamp_millis_opt(0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance_ms(1_500);
        assert_eq!(clock.now(), Utc.timestamp_millis_opt(1_500).unwrap());
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
