mod timers;
mod users;
