use std::time::Duration;

use crate::scheduler::DEFAULT_TICK_SECONDS;

/// Process configuration, read once at startup from environment
/// variables (§10.3). Rocket's own `ROCKET_ADDRESS`/`ROCKET_PORT` are
/// read directly by Rocket and are not duplicated here.
pub struct Config {
    pub database_path: String,
    pub scheduler_tick: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "probewatch.db".into());
        let scheduler_tick = std::env::var("SCHEDULER_TICK_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TICK_SECONDS);

        Config { database_path, scheduler_tick: Duration::from_secs(scheduler_tick) }
    }
}
