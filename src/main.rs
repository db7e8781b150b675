use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use timeboard_lib::{
    init_logging,
    settings::SettingsStore,
    timer::{
        commands::{self, CommandResult},
        watch::{render_lines, watch_loop, WatchOptions},
    },
    AppState,
};

#[derive(Parser)]
#[command(version, about = "Named stopwatches shared across clients")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true, default_value = "timeboard.json")]
    config: PathBuf,

    /// Database file, overriding settings and TIMEBOARD_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a user name to its id, creating the user on first use
    Login { username: String },
    /// List a user's timers, newest first
    List { username: String },
    Create { username: String, name: String },
    Show { id: i64 },
    Start { id: i64 },
    Pause { id: i64 },
    Reset { id: i64 },
    /// Set the displayed time, e.g. 01:30:00 or 01:30
    Seed { id: i64, time: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
    /// Pause every running timer of the user
    PauseAll { username: String },
    /// Remove a user and all of their timers
    DeleteUser { user_id: i64 },
    /// Poll and print a user's timers until Ctrl-C
    Watch {
        username: String,
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        pause_on_exit: bool,
    },
    /// Show or change persisted settings
    Config {
        #[arg(long)]
        database_path: Option<PathBuf>,
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        #[arg(long)]
        pause_on_exit: Option<bool>,
        #[arg(long)]
        debug: Option<bool>,
    },
}

fn emit<T: Serialize>(result: CommandResult<T>) -> Result<()> {
    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = SettingsStore::new(cli.config.clone())?;
    let mut settings = store.get().with_env_overrides();
    if let Some(path) = cli.db {
        settings.database_path = path;
    }

    init_logging(settings.debug);
    if let Some(warning) = store.load_warning() {
        log::warn!("{warning}");
    }

    let command = match cli.command {
        Commands::Config {
            database_path,
            poll_interval_ms,
            pause_on_exit,
            debug,
        } => {
            let changed = database_path.is_some()
                || poll_interval_ms.is_some()
                || pause_on_exit.is_some()
                || debug.is_some();
            let settings = if changed {
                store.update(|settings| {
                    if let Some(path) = database_path {
                        settings.database_path = path;
                    }
                    if let Some(ms) = poll_interval_ms {
                        settings.poll_interval_ms = ms;
                    }
                    if let Some(flag) = pause_on_exit {
                        settings.pause_on_exit = flag;
                    }
                    if let Some(flag) = debug {
                        settings.debug = flag;
                    }
                })?
            } else {
                store.get()
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        command => command,
    };

    log::info!("timeboard starting with settings from {}", store.path().display());

    let state = AppState::open(settings)?;

    match command {
        Commands::Login { username } => emit(commands::login(&state, &username).await),
        Commands::List { username } => {
            let user = commands::login(&state, &username).await?;
            emit(commands::list_timers(&state, user.id).await)
        }
        Commands::Create { username, name } => {
            let user = commands::login(&state, &username).await?;
            emit(commands::create_timer(&state, user.id, &name).await)
        }
        Commands::Show { id } => emit(commands::get_timer(&state, id).await),
        Commands::Start { id } => emit(commands::start_timer(&state, id).await),
        Commands::Pause { id } => emit(commands::pause_timer(&state, id).await),
        Commands::Reset { id } => emit(commands::reset_timer(&state, id).await),
        Commands::Seed { id, time } => emit(commands::set_timer_time(&state, id, &time).await),
        Commands::Rename { id, name } => emit(commands::rename_timer(&state, id, &name).await),
        Commands::Delete { id } => emit(commands::delete_timer(&state, id).await),
        Commands::PauseAll { username } => {
            let user = commands::login(&state, &username).await?;
            emit(commands::pause_all_timers(&state, user.id).await)
        }
        Commands::DeleteUser { user_id } => emit(commands::delete_user(&state, user_id).await),
        Commands::Watch {
            username,
            interval_ms,
            pause_on_exit,
        } => {
            let user = commands::login(&state, &username).await?;
            let mut options = WatchOptions {
                poll_interval: state.settings.poll_interval(),
                pause_on_exit: pause_on_exit || state.settings.pause_on_exit,
            };
            if let Some(ms) = interval_ms {
                options.poll_interval = std::time::Duration::from_millis(
                    ms.max(timeboard_lib::settings::MIN_POLL_INTERVAL_MS),
                );
            }

            let cancel_token = CancellationToken::new();
            let on_signal = cancel_token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            watch_loop(state.timers.clone(), user.id, options, cancel_token, |snapshots| {
                println!("--- {} ({} timers)", user.name, snapshots.len());
                for line in render_lines(snapshots) {
                    println!("{line}");
                }
            })
            .await;
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}
