use chrono::{Duration, Utc};

use crate::db::Store;

/// Recomputes a monitor's 24-hour uptime percentage from recent logs
/// (§4.4). A monitor with zero logs in the window is left untouched
/// rather than reset to 0 (I3).
pub fn recompute(store: &dyn Store, monitor_id: &str) -> rusqlite::Result<()> {
    let since = (Utc::now() - Duration::hours(24)).to_rfc3339();
    let logs = store.find_logs_since(monitor_id, &since)?;

    if logs.is_empty() {
        return Ok(());
    }

    let up_count = logs.iter().filter(|l| l.status == "up").count();
    let pct = (up_count as f64 / logs.len() as f64) * 100.0;
    store.update_uptime_percentage(monitor_id, pct)
}

/// Same UP/total formula as [`recompute`], used by the history endpoint
/// to bucket logs by clock-hour (§6 History endpoint).
pub fn percentage_of(logs: &[crate::models::UptimeLog]) -> f64 {
    if logs.is_empty() {
        return 0.0;
    }
    let up_count = logs.iter().filter(|l| l.status == "up").count();
    (up_count as f64 / logs.len() as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UptimeLog;

    fn log(status: &str) -> UptimeLog {
        UptimeLog {
            id: "x".into(),
            monitor_id: "m".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            status: status.into(),
            response_time: None,
            error_message: None,
            payload: None,
        }
    }

    #[test]
    fn empty_logs_yield_zero() {
        assert_eq!(percentage_of(&[]), 0.0);
    }

    #[test]
    fn warnings_count_as_not_up() {
        let logs = vec![log("up"), log("warning"), log("down"), log("up")];
        assert_eq!(percentage_of(&logs), 50.0);
    }

    #[test]
    fn all_up_is_100_percent() {
        let logs = vec![log("up"), log("up")];
        assert_eq!(percentage_of(&logs), 100.0);
    }
}
