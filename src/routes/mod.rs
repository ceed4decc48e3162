mod alerts;
mod dashboard;
mod monitors;
mod system;

pub use alerts::{create_alert_settings, delete_alert_settings, get_alert_settings};
pub use dashboard::dashboard_stats;
pub use monitors::{check_monitor, create_monitor, delete_monitor, get_monitor, list_monitors, monitor_history, monitor_logs};
pub use system::health;

use rocket::http::Status;
use rocket::serde::json::Json;

use crate::models::CreateMonitor;

pub(crate) type ApiError = (Status, Json<serde_json::Value>);

pub(crate) fn error(status: Status, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// MonitorCreate validation rules, one per kind (§6). Violation is a 400
/// with a per-kind diagnostic.
pub(crate) fn validate_create(input: &CreateMonitor) -> Result<(), ApiError> {
    if input.name.trim().is_empty() {
        return Err(error(Status::BadRequest, "name is required"));
    }

    match input.kind.as_str() {
        "http" | "https" => require(&input.url, "url is required for http/https monitors"),
        "ssl" => require(&input.ssl_domain, "ssl_domain is required for ssl monitors"),
        "dns" => require(&input.dns_hostname, "dns_hostname is required for dns monitors"),
        "port" => {
            require(&input.port_host, "port_host is required for port monitors")?;
            if input.port_number.is_none() {
                return Err(error(Status::BadRequest, "port_number is required for port monitors"));
            }
            Ok(())
        }
        "ping" => require(&input.ping_host, "ping_host is required for ping monitors"),
        "keyword" => {
            require(&input.keyword_url, "keyword_url is required for keyword monitors")?;
            require(&input.keyword_text, "keyword_text is required for keyword monitors")
        }
        "api" => require(&input.api_url, "api_url is required for api monitors"),
        other => Err(error(Status::BadRequest, format!("unknown monitor kind: {other}"))),
    }
}

fn require(field: &Option<String>, message: &str) -> Result<(), ApiError> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(error(Status::BadRequest, message)),
    }
}
