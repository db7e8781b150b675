pub mod timer;
pub mod user;

pub use timer::{Timer, TimerPatch};
pub use user::User;
