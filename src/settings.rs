use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub poll_interval_ms: u64,
    pub pause_on_exit: bool,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("timeboard.sqlite3"),
            poll_interval_ms: 1_000,
            pause_on_exit: false,
            debug: false,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// `TIMEBOARD_DB` and `TIMEBOARD_DEBUG` take precedence over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("TIMEBOARD_DB") {
            if !path.trim().is_empty() {
                self.database_path = PathBuf::from(path);
            }
        }
        if let Ok(value) = std::env::var("TIMEBOARD_DEBUG") {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            bail!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            );
        }
        if self.database_path.as_os_str().is_empty() {
            bail!("database_path must not be empty");
        }
        Ok(())
    }
}

/// Settings backed by a JSON file; updates are written through immediately.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
    load_warning: Option<String>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut load_warning = None;
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                load_warning = Some(format!(
                    "Ignoring unreadable settings in {}: {err}",
                    path.display()
                ));
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
            load_warning,
        })
    }

    /// Set when the file existed but could not be parsed. The store is
    /// usually built before the logger, so the caller reports this.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn update<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        next.validate()?;
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
