pub mod db;
pub mod settings;
pub mod timer;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::info;

use db::Database;
use settings::Settings;
use timer::{Clock, SystemClock, TimerController};

pub use utils::logging::init_logging;

/// Everything a command needs: the store handle and the controller built on
/// it. One per process, passed explicitly to each command.
pub struct AppState {
    pub db: Database,
    pub timers: TimerController,
    pub settings: Settings,
}

impl AppState {
    pub fn open(settings: Settings) -> Result<Self> {
        let db = Database::new(settings.database_path.clone())?;
        Ok(Self::with_database(db, settings, Arc::new(SystemClock)))
    }

    pub fn in_memory(settings: Settings, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Database::in_memory()?;
        Ok(Self::with_database(db, settings, clock))
    }

    fn with_database(db: Database, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        info!("Timer store ready at {}", db.path().display());
        let timers = TimerController::with_clock(db.clone(), clock);
        Self {
            db,
            timers,
            settings,
        }
    }
}
