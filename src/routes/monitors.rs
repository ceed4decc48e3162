use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use rocket::{delete, get, http::Status, post, serde::json::Json, State};

use super::{error, validate_create, ApiError};
use crate::db::Store;
use crate::models::{CreateMonitor, HistoryBucket, Monitor, UptimeLog};
use crate::scheduler::{run_single_check, Scheduler};
use crate::uptime;

#[post("/monitors", format = "json", data = "<input>")]
pub fn create_monitor(input: Json<CreateMonitor>, store: &State<Arc<dyn Store>>) -> Result<Json<Monitor>, ApiError> {
    let input = input.into_inner();
    validate_create(&input)?;

    store
        .create_monitor(&input)
        .map(Json)
        .map_err(|e| error(Status::InternalServerError, format!("failed to create monitor: {e}")))
}

#[get("/monitors")]
pub fn list_monitors(store: &State<Arc<dyn Store>>) -> Result<Json<Vec<Monitor>>, ApiError> {
    store
        .list_monitors()
        .map(Json)
        .map_err(|e| error(Status::InternalServerError, format!("failed to list monitors: {e}")))
}

#[get("/monitors/<id>")]
pub fn get_monitor(id: &str, store: &State<Arc<dyn Store>>) -> Result<Json<Monitor>, ApiError> {
    match store.get_monitor(id) {
        Ok(Some(monitor)) => Ok(Json(monitor)),
        Ok(None) => Err(error(Status::NotFound, "monitor not found")),
        Err(e) => Err(error(Status::InternalServerError, format!("failed to load monitor: {e}"))),
    }
}

#[delete("/monitors/<id>")]
pub fn delete_monitor(id: &str, store: &State<Arc<dyn Store>>) -> Result<Json<serde_json::Value>, ApiError> {
    match store.delete_monitor(id) {
        Ok(true) => Ok(Json(serde_json::json!({ "deleted": true }))),
        Ok(false) => Err(error(Status::NotFound, "monitor not found")),
        Err(e) => Err(error(Status::InternalServerError, format!("failed to delete monitor: {e}"))),
    }
}

/// Synchronous probe, run through the same pipeline as the scheduler
/// (§4.3) but without emitting a state-change event — alerts are wired
/// only through the background loop (§9 Design Note a). Refused while a
/// scheduled probe for the same monitor is already in flight, sharing
/// the scheduler's in-flight set so the two can never interleave (P8,
/// §9 Design Note c).
#[post("/monitors/<id>/check")]
pub async fn check_monitor(id: &str, store: &State<Arc<dyn Store>>, scheduler: &State<Arc<Scheduler>>) -> Result<Json<Monitor>, ApiError> {
    let monitor = match store.get_monitor(id) {
        Ok(Some(m)) => m,
        Ok(None) => return Err(error(Status::NotFound, "monitor not found")),
        Err(e) => return Err(error(Status::InternalServerError, format!("failed to load monitor: {e}"))),
    };

    let in_flight = scheduler.in_flight();
    {
        let mut guard = in_flight.lock().unwrap();
        if guard.contains(&monitor.id) {
            return Err(error(Status::Conflict, "a probe for this monitor is already in flight"));
        }
        guard.insert(monitor.id.clone());
    }

    let inner_store = scheduler.store();
    let clients = scheduler.clients();
    run_single_check(&inner_store, &clients, &monitor).await;
    in_flight.lock().unwrap().remove(&monitor.id);

    match store.get_monitor(id) {
        Ok(Some(refreshed)) => Ok(Json(refreshed)),
        Ok(None) => Err(error(Status::NotFound, "monitor not found")),
        Err(e) => Err(error(Status::InternalServerError, format!("failed to reload monitor: {e}"))),
    }
}

#[get("/monitors/<id>/logs?<hours>")]
pub fn monitor_logs(id: &str, hours: Option<i64>, store: &State<Arc<dyn Store>>) -> Result<Json<Vec<UptimeLog>>, ApiError> {
    let since = (Utc::now() - ChronoDuration::hours(hours.unwrap_or(24))).to_rfc3339();
    let mut logs = store
        .find_logs_since(id, &since)
        .map_err(|e| error(Status::InternalServerError, format!("failed to load logs: {e}")))?;
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(logs))
}

/// Buckets logs by clock-hour and reports uptime_percentage /
/// avg_response_time / total_checks per bucket (§6 History endpoint).
#[get("/monitors/<id>/history?<hours>")]
pub fn monitor_history(id: &str, hours: Option<i64>, store: &State<Arc<dyn Store>>) -> Result<Json<Vec<HistoryBucket>>, ApiError> {
    let since = (Utc::now() - ChronoDuration::hours(hours.unwrap_or(24))).to_rfc3339();
    let logs = store
        .find_logs_since(id, &since)
        .map_err(|e| error(Status::InternalServerError, format!("failed to load logs: {e}")))?;

    let mut buckets: std::collections::BTreeMap<DateTime<Utc>, Vec<&UptimeLog>> = std::collections::BTreeMap::new();
    for log in &logs {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&log.timestamp) {
            let hour = ts.with_timezone(&Utc).date_naive().and_hms_opt(ts.hour(), 0, 0).unwrap().and_utc();
            buckets.entry(hour).or_default().push(log);
        }
    }

    let result = buckets
        .into_iter()
        .map(|(hour, bucket_logs)| {
            let owned: Vec<UptimeLog> = bucket_logs.into_iter().cloned().collect();
            let up_logs: Vec<&UptimeLog> = owned.iter().filter(|l| l.status == "up").collect();
            let avg_response_time = if up_logs.is_empty() {
                0.0
            } else {
                up_logs.iter().filter_map(|l| l.response_time).sum::<f64>() / up_logs.len() as f64 * 1000.0
            };
            HistoryBucket {
                timestamp: hour.to_rfc3339(),
                uptime_percentage: uptime::percentage_of(&owned),
                avg_response_time,
                total_checks: owned.len() as u32,
            }
        })
        .collect();

    Ok(Json(result))
}
