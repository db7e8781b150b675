use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};

use crate::db::{
    helpers::{
        format_datetime, format_optional_datetime, parse_datetime, parse_optional_datetime,
        to_i64, to_u64,
    },
    models::{Timer, TimerPatch},
    Database,
};
use crate::timer::{TimerClock, TimerName};

const TIMER_COLUMNS: &str =
    "id, user_id, name, start_time, paused_at, total_paused_duration, is_running, created_at";

fn row_to_timer(row: &Row) -> Result<Timer> {
    let id: i64 = row.get("id")?;
    let start_time: Option<String> = row.get("start_time")?;
    let paused_at: Option<String> = row.get("paused_at")?;
    let total_paused_duration: i64 = row.get("total_paused_duration")?;
    let is_running: bool = row.get("is_running")?;
    let created_at: String = row.get("created_at")?;

    let clock = TimerClock::from_parts(
        parse_optional_datetime(start_time, "start_time")?,
        parse_optional_datetime(paused_at, "paused_at")?,
        to_u64(total_paused_duration, "total_paused_duration")?,
        is_running,
    )
    .map_err(|err| anyhow!("timer {id} holds an inconsistent clock: {err}"))?;

    Ok(Timer {
        id,
        owner_id: row.get("user_id")?,
        name: row.get("name")?,
        clock,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Inserts an idle timer. Returns `None` when the owner does not exist.
    pub async fn create_timer(
        &self,
        owner_id: i64,
        name: &TimerName,
        now: DateTime<Utc>,
    ) -> Result<Option<Timer>> {
        let name = name.as_str().to_string();
        self.execute(move |conn| {
            let owner_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![owner_id],
                |row| row.get(0),
            )?;
            if !owner_exists {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO timers (user_id, name, total_paused_duration, is_running, created_at)
                 VALUES (?1, ?2, 0, 0, ?3)",
                params![owner_id, name, format_datetime(&now)],
            )
            .context("failed to insert timer")?;

            let timer_id = conn.last_insert_rowid();
            let timer = conn
                .query_row(
                    &format!("SELECT {TIMER_COLUMNS} FROM timers WHERE id = ?1"),
                    params![timer_id],
                    |row| Ok(row_to_timer(row)),
                )
                .context("timer not found after insert")??;

            Ok(Some(timer))
        })
        .await
    }

    /// Most recently created first.
    pub async fn list_timers(&self, owner_id: i64) -> Result<Vec<Timer>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TIMER_COLUMNS}
                 FROM timers
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;

            let mut rows = stmt.query(params![owner_id])?;
            let mut timers = Vec::new();
            while let Some(row) = rows.next()? {
                timers.push(row_to_timer(row)?);
            }

            Ok(timers)
        })
        .await
    }

    pub async fn get_timer(&self, timer_id: i64) -> Result<Option<Timer>> {
        self.execute(move |conn| {
            let timer = conn
                .query_row(
                    &format!("SELECT {TIMER_COLUMNS} FROM timers WHERE id = ?1"),
                    params![timer_id],
                    |row| Ok(row_to_timer(row)),
                )
                .optional()?
                .transpose()?;
            Ok(timer)
        })
        .await
    }

    /// Applies `patch` in one UPDATE and reports how many rows changed.
    pub async fn update_timer_fields(&self, timer_id: i64, patch: TimerPatch) -> Result<usize> {
        if patch.is_empty() {
            bail!("no timer fields to update");
        }

        self.execute(move |conn| {
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(name) = patch.name {
                updates.push("name = ?");
                params_vec.push(Box::new(name.into_inner()));
            }
            if let Some(clock) = patch.clock {
                updates.push("start_time = ?");
                params_vec.push(Box::new(format_optional_datetime(
                    clock.start_instant().as_ref(),
                )));
                updates.push("paused_at = ?");
                params_vec.push(Box::new(format_optional_datetime(
                    clock.paused_at_instant().as_ref(),
                )));
                updates.push("total_paused_duration = ?");
                params_vec.push(Box::new(to_i64(clock.accumulated_paused_ms())?));
                updates.push("is_running = ?");
                params_vec.push(Box::new(clock.is_running()));
            }

            let query = format!("UPDATE timers SET {} WHERE id = ?", updates.join(", "));
            params_vec.push(Box::new(timer_id));

            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

            let changed = conn
                .execute(&query, params_refs.as_slice())
                .with_context(|| format!("failed to update timer {timer_id}"))?;
            Ok(changed)
        })
        .await
    }

    /// Deleting a missing timer changes zero rows and is not an error.
    pub async fn delete_timer(&self, timer_id: i64) -> Result<usize> {
        self.execute(move |conn| {
            let changed = conn
                .execute("DELETE FROM timers WHERE id = ?1", params![timer_id])
                .with_context(|| format!("failed to delete timer {timer_id}"))?;
            Ok(changed)
        })
        .await
    }
}
