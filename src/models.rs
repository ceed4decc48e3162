use serde::{Deserialize, Serialize};

/// A declared target plus the policy the engine checks it against.
///
/// One struct carries every kind's fields (§3 "kind-parametric monitor
/// record" — the fields not relevant to `kind` are simply `None`). This
/// matches the flat row shape of the `monitors` table directly: there is
/// no ORM layer translating between a tagged variant and a SQL row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub interval_seconds: u32,
    pub timeout_seconds: u32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    pub uptime_percentage: f64,
    pub created_at: String,

    // http / https / keyword
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    // ssl
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_expiry_threshold_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_days_until_expiry: Option<i64>,

    // dns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_dns_result: Option<String>,

    // port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_protocol: Option<String>,

    // ping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_packet_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_packet_loss: Option<f64>,

    // keyword
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_match_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_found: Option<bool>,

    // api
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_headers: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_expected_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_expected_response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_json_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_expected_json_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_validation_result: Option<bool>,
}

impl Monitor {
    /// First non-null of the kind-specific endpoint fields, in the order
    /// §4.5 specifies, used as the email template's "what is this" line.
    pub fn representative_url(&self) -> &str {
        self.url
            .as_deref()
            .or(self.ssl_domain.as_deref())
            .or(self.dns_hostname.as_deref())
            .or(self.port_host.as_deref())
            .or(self.ping_host.as_deref())
            .or(self.keyword_url.as_deref())
            .or(self.api_url.as_deref())
            .unwrap_or("N/A")
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMonitor {
    pub name: String,
    pub kind: String,
    #[serde(default = "default_interval")]
    pub interval_seconds: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,

    pub url: Option<String>,

    pub ssl_domain: Option<String>,
    pub ssl_expiry_threshold_days: Option<i64>,

    pub dns_hostname: Option<String>,
    pub dns_server: Option<String>,
    pub dns_record_type: Option<String>,
    pub expected_dns_result: Option<String>,

    pub port_host: Option<String>,
    pub port_number: Option<u16>,
    pub port_protocol: Option<String>,

    pub ping_host: Option<String>,
    pub ping_count: Option<u32>,
    pub ping_packet_size: Option<u32>,

    pub keyword_url: Option<String>,
    pub keyword_text: Option<String>,
    pub keyword_match_type: Option<String>,

    pub api_url: Option<String>,
    pub api_method: Option<String>,
    pub api_headers: Option<serde_json::Value>,
    pub api_body: Option<String>,
    pub api_expected_status: Option<u16>,
    pub api_expected_response_time: Option<f64>,
    pub api_json_path: Option<String>,
    pub api_expected_json_value: Option<String>,
}

fn default_interval() -> u32 {
    300
}
fn default_timeout() -> u32 {
    10
}

/// One completed probe attempt (§3 UptimeLog). Never mutated after insert.
#[derive(Debug, Serialize, Clone)]
pub struct UptimeLog {
    pub id: String,
    pub monitor_id: String,
    pub timestamp: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Clone)]
pub struct AlertSettings {
    pub id: String,
    pub monitor_id: String,
    pub email: String,
    pub email_enabled: bool,
    pub alert_on_down: bool,
    pub alert_on_up: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertSettings {
    pub monitor_id: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub email_enabled: bool,
    #[serde(default = "default_true")]
    pub alert_on_down: bool,
    #[serde(default = "default_true")]
    pub alert_on_up: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total: u32,
    pub up: u32,
    pub down: u32,
    pub overall_uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryBucket {
    pub timestamp: String,
    pub uptime_percentage: f64,
    pub avg_response_time: f64,
    pub total_checks: u32,
}
