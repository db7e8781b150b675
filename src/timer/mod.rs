pub mod clock;
pub mod commands;
pub mod controller;
pub mod engine;
pub mod error;
pub mod state;
pub mod watch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{TimerController, TimerSnapshot};
pub use engine::Transition;
pub use error::{TimerError, TimerResult};
pub use state::{format_elapsed, SeedTime, TimerClock, TimerName, UserName};
