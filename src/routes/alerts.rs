use std::sync::Arc;

use rocket::{delete, get, http::Status, post, serde::json::Json, State};

use super::{error, ApiError};
use crate::db::Store;
use crate::models::{AlertSettings, CreateAlertSettings};

#[post("/alerts", format = "json", data = "<input>")]
pub fn create_alert_settings(input: Json<CreateAlertSettings>, store: &State<Arc<dyn Store>>) -> Result<Json<AlertSettings>, ApiError> {
    let input = input.into_inner();

    if input.email.trim().is_empty() {
        return Err(error(Status::BadRequest, "email is required"));
    }

    match store.find_alert_settings(&input.monitor_id) {
        Ok(Some(_)) => return Err(error(Status::BadRequest, "alert settings already exist for this monitor")),
        Ok(None) => {}
        Err(e) => return Err(error(Status::InternalServerError, format!("failed to check existing alert settings: {e}"))),
    }

    store
        .create_alert_settings(&input)
        .map(Json)
        .map_err(|e| error(Status::InternalServerError, format!("failed to create alert settings: {e}")))
}

#[get("/alerts/<monitor_id>")]
pub fn get_alert_settings(monitor_id: &str, store: &State<Arc<dyn Store>>) -> Result<Json<AlertSettings>, ApiError> {
    match store.find_alert_settings(monitor_id) {
        Ok(Some(settings)) => Ok(Json(settings)),
        Ok(None) => Err(error(Status::NotFound, "alert settings not found")),
        Err(e) => Err(error(Status::InternalServerError, format!("failed to load alert settings: {e}"))),
    }
}

#[delete("/alerts/<monitor_id>")]
pub fn delete_alert_settings(monitor_id: &str, store: &State<Arc<dyn Store>>) -> Result<Json<serde_json::Value>, ApiError> {
    match store.delete_alert_settings(monitor_id) {
        Ok(true) => Ok(Json(serde_json::json!({ "deleted": true }))),
        Ok(false) => Err(error(Status::NotFound, "alert settings not found")),
        Err(e) => Err(error(Status::InternalServerError, format!("failed to delete alert settings: {e}"))),
    }
}
