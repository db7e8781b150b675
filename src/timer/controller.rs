use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::db::{Database, Timer, TimerPatch, User};

use super::{
    clock::{Clock, SystemClock},
    error::{TimerError, TimerResult},
    format_elapsed, SeedTime, TimerName, Transition, UserName,
};

/// A timer together with the elapsed time it displays at `as_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    #[serde(flatten)]
    pub timer: Timer,
    pub elapsed_ms: u64,
    pub display: String,
    pub as_of: DateTime<Utc>,
}

impl TimerSnapshot {
    pub fn at(timer: Timer, now: DateTime<Utc>) -> Self {
        let elapsed_ms = timer.clock.elapsed_ms(now);
        Self {
            timer,
            elapsed_ms,
            display: format_elapsed(elapsed_ms),
            as_of: now,
        }
    }
}

/// Loads a record, runs it through the transition engine and writes the
/// result back. Holds no timer state of its own; the store is authoritative.
#[derive(Clone)]
pub struct TimerController {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl TimerController {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn login(&self, username: &str) -> TimerResult<User> {
        let name = UserName::parse(username)?;
        let user = self.db.resolve_or_create_user(&name, self.now()).await?;
        info!("Resolved user '{}' to id {}", user.name, user.id);
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: i64) -> TimerResult<usize> {
        let changed = self.db.delete_user(user_id).await?;
        if changed > 0 {
            info!("Deleted user {user_id} and their timers");
        }
        Ok(changed)
    }

    async fn require_user(&self, user_id: i64) -> TimerResult<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| TimerError::user_not_found(user_id))
    }

    pub async fn list_timers(&self, user_id: i64) -> TimerResult<Vec<Timer>> {
        self.require_user(user_id).await?;
        Ok(self.db.list_timers(user_id).await?)
    }

    pub async fn create_timer(&self, user_id: i64, name: &str) -> TimerResult<Timer> {
        let name = TimerName::parse(name)?;
        let timer = self
            .db
            .create_timer(user_id, &name, self.now())
            .await?
            .ok_or_else(|| TimerError::user_not_found(user_id))?;
        info!("Created timer {} '{}' for user {}", timer.id, timer.name, user_id);
        Ok(timer)
    }

    pub async fn get_timer(&self, timer_id: i64) -> TimerResult<Timer> {
        self.db
            .get_timer(timer_id)
            .await?
            .ok_or_else(|| TimerError::timer_not_found(timer_id))
    }

    /// Runs `transition` against the stored record as of `now`.
    ///
    /// A failed precondition leaves the row untouched. Concurrent writers are
    /// last-write-wins.
    pub async fn apply(
        &self,
        timer_id: i64,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> TimerResult<Timer> {
        let current = self.get_timer(timer_id).await?;
        let next = current.clock.apply(transition, now)?;

        self.write(timer_id, TimerPatch::clock(next)).await?;
        info!(
            "Timer {} {} at {} (running={})",
            timer_id,
            transition.as_str(),
            now,
            next.is_running()
        );
        self.get_timer(timer_id).await
    }

    pub async fn start(&self, timer_id: i64, now: DateTime<Utc>) -> TimerResult<Timer> {
        self.apply(timer_id, Transition::Start, now).await
    }

    pub async fn pause(&self, timer_id: i64, now: DateTime<Utc>) -> TimerResult<Timer> {
        self.apply(timer_id, Transition::Pause, now).await
    }

    pub async fn reset(&self, timer_id: i64, now: DateTime<Utc>) -> TimerResult<Timer> {
        self.apply(timer_id, Transition::Reset, now).await
    }

    /// Seeds from text such as `01:30:00`. A missing timer wins over bad input.
    pub async fn seed(&self, timer_id: i64, time: &str, now: DateTime<Utc>) -> TimerResult<Timer> {
        self.get_timer(timer_id).await?;
        let seed: SeedTime = time.parse()?;
        self.apply(timer_id, Transition::Seed(seed), now).await
    }

    pub async fn rename(&self, timer_id: i64, name: &str) -> TimerResult<Timer> {
        self.get_timer(timer_id).await?;
        let name = TimerName::parse(name)?;
        self.write(timer_id, TimerPatch::rename(name)).await?;
        self.get_timer(timer_id).await
    }

    /// Reports the number of rows removed; zero for an unknown id.
    pub async fn delete_timer(&self, timer_id: i64) -> TimerResult<usize> {
        let changed = self.db.delete_timer(timer_id).await?;
        if changed > 0 {
            info!("Deleted timer {timer_id}");
        }
        Ok(changed)
    }

    /// Pauses every running timer of the user, all stamped with `now`.
    ///
    /// Each timer is re-read right before its pause is written, so a start or
    /// seed from another client is only lost if it lands between that read and
    /// the write. Best effort: a timer that fails to pause is logged and
    /// skipped, so the returned list may mix paused and running timers.
    pub async fn pause_all(&self, user_id: i64, now: DateTime<Utc>) -> TimerResult<Vec<Timer>> {
        let running: Vec<i64> = self
            .list_timers(user_id)
            .await?
            .into_iter()
            .filter(|timer| timer.clock.is_running())
            .map(|timer| timer.id)
            .collect();

        let mut paused = 0usize;
        for timer_id in running {
            match self.pause_latest(timer_id, now).await {
                Ok(true) => paused += 1,
                Ok(false) => debug!("Timer {timer_id} stopped before the bulk pause reached it"),
                Err(err) => warn!("Failed to pause timer {timer_id} for user {user_id}: {err}"),
            }
        }

        info!("Paused {paused} running timer(s) for user {user_id}");
        Ok(self.db.list_timers(user_id).await?)
    }

    /// Pauses the stored record if it is still running.
    async fn pause_latest(&self, timer_id: i64, now: DateTime<Utc>) -> TimerResult<bool> {
        let current = self.get_timer(timer_id).await?;
        if !current.clock.is_running() {
            return Ok(false);
        }
        let next = current.clock.paused(now)?;
        self.write(timer_id, TimerPatch::clock(next)).await?;
        Ok(true)
    }

    async fn write(&self, timer_id: i64, patch: TimerPatch) -> TimerResult<()> {
        match self.db.update_timer_fields(timer_id, patch).await? {
            0 => Err(TimerError::timer_not_found(timer_id)),
            _ => Ok(()),
        }
    }
}
