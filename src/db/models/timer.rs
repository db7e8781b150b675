//! Timer row model and the partial update applied to it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::{TimerClock, TimerName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    #[serde(flatten)]
    pub clock: TimerClock,
    pub created_at: DateTime<Utc>,
}

/// Fields to overwrite on a single timer row. `None` leaves a column alone.
///
/// A clock is always written as a whole so the row never mixes the temporal
/// fields of two writers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerPatch {
    pub name: Option<TimerName>,
    pub clock: Option<TimerClock>,
}

impl TimerPatch {
    pub fn clock(clock: TimerClock) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    pub fn rename(name: TimerName) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.clock.is_none()
    }
}
