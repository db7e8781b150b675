use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
}

impl TimerError {
    pub fn timer_not_found(timer_id: i64) -> Self {
        TimerError::NotFound(format!("timer {timer_id}"))
    }

    pub fn user_not_found(user_id: i64) -> Self {
        TimerError::NotFound(format!("user {user_id}"))
    }

    /// HTTP-equivalent status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            TimerError::Validation(_) | TimerError::InvalidTransition(_) => 400,
            TimerError::NotFound(_) => 404,
            TimerError::StoreUnavailable(_) => 500,
        }
    }
}

impl From<anyhow::Error> for TimerError {
    fn from(err: anyhow::Error) -> Self {
        TimerError::StoreUnavailable(format!("{err:#}"))
    }
}

pub type TimerResult<T> = std::result::Result<T, TimerError>;
