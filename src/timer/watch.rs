use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{TimerController, TimerSnapshot};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    /// Pause the user's running timers once the watch is cancelled.
    pub pause_on_exit: bool,
}

/// Polls the user's timers until `cancel_token` fires, handing each fresh set
/// of snapshots to `render`.
///
/// Convergence with other clients comes only from re-fetching: a change made
/// elsewhere shows up within one poll interval. Returns the number of
/// successful polls.
pub async fn watch_loop<F>(
    controller: TimerController,
    user_id: i64,
    options: WatchOptions,
    cancel_token: CancellationToken,
    mut render: F,
) -> u64
where
    F: FnMut(&[TimerSnapshot]),
{
    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("watch loop for user {} shutting down", user_id);
                break;
            }
            _ = ticker.tick() => {
                match controller.list_timers(user_id).await {
                    Ok(timers) => {
                        let now = controller.now();
                        let snapshots: Vec<TimerSnapshot> = timers
                            .into_iter()
                            .map(|timer| TimerSnapshot::at(timer, now))
                            .collect();
                        polls += 1;
                        render(&snapshots);
                    }
                    Err(err) => log_warn!("poll for user {} failed: {}", user_id, err),
                }
            }
        }
    }

    if options.pause_on_exit {
        match controller.pause_all(user_id, controller.now()).await {
            Ok(_) => log_info!("paused running timers of user {} on exit", user_id),
            Err(err) => log_error!(
                "best-effort pause on exit failed for user {}: {}",
                user_id,
                err
            ),
        }
    }

    polls
}

/// One line per timer: name, elapsed time and state.
pub fn render_lines(snapshots: &[TimerSnapshot]) -> Vec<String> {
    snapshots
        .iter()
        .map(|snapshot| {
            let clock = &snapshot.timer.clock;
            let state = if clock.is_running() {
                "running"
            } else if clock.is_idle() {
                "idle"
            } else {
                "paused"
            };
            format!(
                "#{:<5} {:<24} {:>10}  {}",
                snapshot.timer.id, snapshot.timer.name, snapshot.display, state
            )
        })
        .collect()
}
