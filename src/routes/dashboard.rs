use std::sync::Arc;

use rocket::{get, http::Status, serde::json::Json, State};

use super::{error, ApiError};
use crate::db::Store;
use crate::models::DashboardStats;

#[get("/dashboard/stats")]
pub fn dashboard_stats(store: &State<Arc<dyn Store>>) -> Result<Json<DashboardStats>, ApiError> {
    let monitors = store
        .list_monitors()
        .map_err(|e| error(Status::InternalServerError, format!("failed to list monitors: {e}")))?;

    let total = monitors.len() as u32;
    let up = monitors.iter().filter(|m| m.status == "up").count() as u32;
    let down = monitors.iter().filter(|m| m.status == "down").count() as u32;
    let overall_uptime = if monitors.is_empty() {
        0.0
    } else {
        monitors.iter().map(|m| m.uptime_percentage).sum::<f64>() / monitors.len() as f64
    };

    Ok(Json(DashboardStats { total, up, down, overall_uptime }))
}
