use rocket::{get, serde::json::Json};

#[get("/")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "probewatch",
        "status": "ok",
        "version": "0.1.0"
    }))
}
