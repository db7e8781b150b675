//! Transport-facing commands. Each one resolves the operation instant from the
//! controller clock, delegates, and turns failures into [`CommandError`].

use serde::{Deserialize, Serialize};

use crate::{db::User, AppState};

use super::{TimerController, TimerError, TimerSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub status: u16,
    pub message: String,
}

impl From<TimerError> for CommandError {
    fn from(err: TimerError) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for CommandError {}

pub type CommandResult<T> = Result<T, CommandError>;

fn controller_from_state(state: &AppState) -> TimerController {
    state.timers.clone()
}

fn snapshots(controller: &TimerController, timers: Vec<crate::db::Timer>) -> Vec<TimerSnapshot> {
    let now = controller.now();
    timers
        .into_iter()
        .map(|timer| TimerSnapshot::at(timer, now))
        .collect()
}

pub async fn login(state: &AppState, username: &str) -> CommandResult<User> {
    let controller = controller_from_state(state);
    Ok(controller.login(username).await?)
}

pub async fn delete_user(state: &AppState, user_id: i64) -> CommandResult<()> {
    let controller = controller_from_state(state);
    match controller.delete_user(user_id).await? {
        0 => Err(TimerError::user_not_found(user_id).into()),
        _ => Ok(()),
    }
}

pub async fn list_timers(state: &AppState, user_id: i64) -> CommandResult<Vec<TimerSnapshot>> {
    let controller = controller_from_state(state);
    let timers = controller.list_timers(user_id).await?;
    Ok(snapshots(&controller, timers))
}

pub async fn get_timer(state: &AppState, timer_id: i64) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let timer = controller.get_timer(timer_id).await?;
    Ok(TimerSnapshot::at(timer, controller.now()))
}

pub async fn create_timer(
    state: &AppState,
    user_id: i64,
    name: &str,
) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let timer = controller.create_timer(user_id, name).await?;
    Ok(TimerSnapshot::at(timer, controller.now()))
}

pub async fn start_timer(state: &AppState, timer_id: i64) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let now = controller.now();
    let timer = controller.start(timer_id, now).await?;
    Ok(TimerSnapshot::at(timer, now))
}

pub async fn pause_timer(state: &AppState, timer_id: i64) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let now = controller.now();
    let timer = controller.pause(timer_id, now).await?;
    Ok(TimerSnapshot::at(timer, now))
}

pub async fn reset_timer(state: &AppState, timer_id: i64) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let now = controller.now();
    let timer = controller.reset(timer_id, now).await?;
    Ok(TimerSnapshot::at(timer, now))
}

pub async fn set_timer_time(
    state: &AppState,
    timer_id: i64,
    time: &str,
) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let now = controller.now();
    let timer = controller.seed(timer_id, time, now).await?;
    Ok(TimerSnapshot::at(timer, now))
}

pub async fn rename_timer(
    state: &AppState,
    timer_id: i64,
    name: &str,
) -> CommandResult<TimerSnapshot> {
    let controller = controller_from_state(state);
    let timer = controller.rename(timer_id, name).await?;
    Ok(TimerSnapshot::at(timer, controller.now()))
}

/// Unlike the store, the transport reports an unknown id as 404.
pub async fn delete_timer(state: &AppState, timer_id: i64) -> CommandResult<()> {
    let controller = controller_from_state(state);
    match controller.delete_timer(timer_id).await? {
        0 => Err(TimerError::timer_not_found(timer_id).into()),
        _ => Ok(()),
    }
}

pub async fn pause_all_timers(state: &AppState, user_id: i64) -> CommandResult<Vec<TimerSnapshot>> {
    let controller = controller_from_state(state);
    let timers = controller.pause_all(user_id, controller.now()).await?;
    Ok(snapshots(&controller, timers))
}
