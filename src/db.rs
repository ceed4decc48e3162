use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};

use crate::models::{AlertSettings, CreateAlertSettings, CreateMonitor, Monitor, UptimeLog};
use crate::probes::Status;

/// Narrow read/write interface the engine needs from persistence (§6).
/// The only production implementation is [`SqliteStore`]; the trait seam
/// exists so the check pipeline and API layer never call `rusqlite`
/// directly, which is what lets tests substitute a store that never
/// touches disk. Methods are synchronous — like the teacher's `Db`, a
/// single `Mutex<Connection>` is cheap enough to lock from async code
/// directly without a blocking-pool hop.
pub trait Store: Send + Sync {
    fn list_monitors(&self) -> SqlResult<Vec<Monitor>>;
    fn get_monitor(&self, id: &str) -> SqlResult<Option<Monitor>>;
    fn create_monitor(&self, input: &CreateMonitor) -> SqlResult<Monitor>;
    fn delete_monitor(&self, id: &str) -> SqlResult<bool>;
    fn update_monitor_result(&self, id: &str, update: &MonitorResultUpdate) -> SqlResult<()>;
    fn update_uptime_percentage(&self, id: &str, pct: f64) -> SqlResult<()>;
    fn insert_log(&self, log: &UptimeLog) -> SqlResult<()>;
    fn find_logs_since(&self, monitor_id: &str, since_rfc3339: &str) -> SqlResult<Vec<UptimeLog>>;
    fn find_alert_settings(&self, monitor_id: &str) -> SqlResult<Option<AlertSettings>>;
    fn create_alert_settings(&self, input: &CreateAlertSettings) -> SqlResult<AlertSettings>;
    fn delete_alert_settings(&self, monitor_id: &str) -> SqlResult<bool>;
}

/// The subset of a monitor row the check pipeline writes after a probe
/// (§4.3 step 3): the common fields plus whichever kind-specific
/// persisted fields apply.
pub struct MonitorResultUpdate {
    pub status: Status,
    pub response_time: Option<f64>,
    pub last_checked_at: String,
    pub ssl_expires_at: Option<String>,
    pub ssl_days_until_expiry: Option<i64>,
    pub ping_packet_loss: Option<f64>,
    pub keyword_found: Option<bool>,
    pub actual_status_code: Option<u16>,
    pub json_validation_result: Option<bool>,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
        let store = SqliteStore { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> SqlResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS monitors (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                interval_seconds INTEGER NOT NULL DEFAULT 300,
                timeout_seconds INTEGER NOT NULL DEFAULT 10,
                status TEXT NOT NULL DEFAULT 'unknown',
                last_checked_at TEXT,
                response_time REAL,
                uptime_percentage REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),

                url TEXT,

                ssl_domain TEXT,
                ssl_expiry_threshold_days INTEGER,
                ssl_expires_at TEXT,
                ssl_days_until_expiry INTEGER,

                dns_hostname TEXT,
                dns_server TEXT,
                dns_record_type TEXT,
                expected_dns_result TEXT,

                port_host TEXT,
                port_number INTEGER,
                port_protocol TEXT,

                ping_host TEXT,
                ping_count INTEGER,
                ping_packet_size INTEGER,
                ping_packet_loss REAL,

                keyword_url TEXT,
                keyword_text TEXT,
                keyword_match_type TEXT,
                keyword_found INTEGER,

                api_url TEXT,
                api_method TEXT,
                api_headers TEXT,
                api_body TEXT,
                api_expected_status INTEGER,
                api_expected_response_time REAL,
                api_json_path TEXT,
                api_expected_json_value TEXT,
                actual_status_code INTEGER,
                json_validation_result INTEGER
            );

            CREATE TABLE IF NOT EXISTS uptime_logs (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                status TEXT NOT NULL,
                response_time REAL,
                error_message TEXT,
                payload TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_uptime_logs_monitor_ts ON uptime_logs(monitor_id, timestamp DESC);

            CREATE TABLE IF NOT EXISTS alert_settings (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL UNIQUE REFERENCES monitors(id) ON DELETE CASCADE,
                email TEXT NOT NULL,
                email_enabled INTEGER NOT NULL DEFAULT 1,
                alert_on_down INTEGER NOT NULL DEFAULT 1,
                alert_on_up INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> SqlResult<T>) -> SqlResult<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }
}

fn row_to_monitor(row: &rusqlite::Row) -> rusqlite::Result<Monitor> {
    Ok(Monitor {
        id: row.get("id")?,
        name: row.get("name")?,
        kind: row.get("kind")?,
        interval_seconds: row.get("interval_seconds")?,
        timeout_seconds: row.get("timeout_seconds")?,
        status: row.get("status")?,
        last_checked_at: row.get("last_checked_at")?,
        response_time: row.get("response_time")?,
        uptime_percentage: row.get("uptime_percentage")?,
        created_at: row.get("created_at")?,
        url: row.get("url")?,
        ssl_domain: row.get("ssl_domain")?,
        ssl_expiry_threshold_days: row.get("ssl_expiry_threshold_days")?,
        ssl_expires_at: row.get("ssl_expires_at")?,
        ssl_days_until_expiry: row.get("ssl_days_until_expiry")?,
        dns_hostname: row.get("dns_hostname")?,
        dns_server: row.get("dns_server")?,
        dns_record_type: row.get("dns_record_type")?,
        expected_dns_result: row.get("expected_dns_result")?,
        port_host: row.get("port_host")?,
        port_number: row.get::<_, Option<i64>>("port_number")?.map(|v| v as u16),
        port_protocol: row.get("port_protocol")?,
        ping_host: row.get("ping_host")?,
        ping_count: row.get::<_, Option<i64>>("ping_count")?.map(|v| v as u32),
        ping_packet_size: row.get::<_, Option<i64>>("ping_packet_size")?.map(|v| v as u32),
        ping_packet_loss: row.get("ping_packet_loss")?,
        keyword_url: row.get("keyword_url")?,
        keyword_text: row.get("keyword_text")?,
        keyword_match_type: row.get("keyword_match_type")?,
        keyword_found: row.get::<_, Option<i64>>("keyword_found")?.map(|v| v != 0),
        api_url: row.get("api_url")?,
        api_method: row.get("api_method")?,
        api_headers: row
            .get::<_, Option<String>>("api_headers")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        api_body: row.get("api_body")?,
        api_expected_status: row.get::<_, Option<i64>>("api_expected_status")?.map(|v| v as u16),
        api_expected_response_time: row.get("api_expected_response_time")?,
        api_json_path: row.get("api_json_path")?,
        api_expected_json_value: row.get("api_expected_json_value")?,
        actual_status_code: row.get::<_, Option<i64>>("actual_status_code")?.map(|v| v as u16),
        json_validation_result: row.get::<_, Option<i64>>("json_validation_result")?.map(|v| v != 0),
    })
}

fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<UptimeLog> {
    Ok(UptimeLog {
        id: row.get("id")?,
        monitor_id: row.get("monitor_id")?,
        timestamp: row.get("timestamp")?,
        status: row.get("status")?,
        response_time: row.get("response_time")?,
        error_message: row.get("error_message")?,
        payload: row
            .get::<_, Option<String>>("payload")?
            .and_then(|s| serde_json::from_str(&s).ok()),
    })
}

fn row_to_alert_settings(row: &rusqlite::Row) -> rusqlite::Result<AlertSettings> {
    Ok(AlertSettings {
        id: row.get("id")?,
        monitor_id: row.get("monitor_id")?,
        email: row.get("email")?,
        email_enabled: row.get::<_, i64>("email_enabled")? != 0,
        alert_on_down: row.get::<_, i64>("alert_on_down")? != 0,
        alert_on_up: row.get::<_, i64>("alert_on_up")? != 0,
        created_at: row.get("created_at")?,
    })
}

const MONITOR_COLUMNS: &str = "id, name, kind, interval_seconds, timeout_seconds, status, last_checked_at, response_time,
     uptime_percentage, created_at, url, ssl_domain, ssl_expiry_threshold_days, ssl_expires_at, ssl_days_until_expiry,
     dns_hostname, dns_server, dns_record_type, expected_dns_result, port_host, port_number, port_protocol,
     ping_host, ping_count, ping_packet_size, ping_packet_loss, keyword_url, keyword_text, keyword_match_type, keyword_found,
     api_url, api_method, api_headers, api_body, api_expected_status, api_expected_response_time,
     api_json_path, api_expected_json_value, actual_status_code, json_validation_result";

impl Store for SqliteStore {
    fn list_monitors(&self) -> SqlResult<Vec<Monitor>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY created_at ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_monitor)?;
            rows.collect()
        })
    }

    fn get_monitor(&self, id: &str) -> SqlResult<Option<Monitor>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_monitor).optional()
        })
    }

    fn create_monitor(&self, input: &CreateMonitor) -> SqlResult<Monitor> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO monitors (
                    id, name, kind, interval_seconds, timeout_seconds, status, uptime_percentage,
                    url, ssl_domain, ssl_expiry_threshold_days,
                    dns_hostname, dns_server, dns_record_type, expected_dns_result,
                    port_host, port_number, port_protocol,
                    ping_host, ping_count, ping_packet_size,
                    keyword_url, keyword_text, keyword_match_type,
                    api_url, api_method, api_headers, api_body, api_expected_status,
                    api_expected_response_time, api_json_path, api_expected_json_value
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, 'unknown', 0,
                    ?6, ?7, ?8,
                    ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15,
                    ?16, ?17, ?18,
                    ?19, ?20, ?21,
                    ?22, ?23, ?24, ?25, ?26,
                    ?27, ?28, ?29
                )",
                params![
                    id,
                    input.name,
                    input.kind,
                    input.interval_seconds,
                    input.timeout_seconds,
                    input.url,
                    input.ssl_domain,
                    input.ssl_expiry_threshold_days,
                    input.dns_hostname,
                    input.dns_server,
                    input.dns_record_type,
                    input.expected_dns_result,
                    input.port_host,
                    input.port_number,
                    input.port_protocol,
                    input.ping_host,
                    input.ping_count,
                    input.ping_packet_size,
                    input.keyword_url,
                    input.keyword_text,
                    input.keyword_match_type,
                    input.api_url,
                    input.api_method,
                    input.api_headers.as_ref().map(|v| v.to_string()),
                    input.api_body,
                    input.api_expected_status,
                    input.api_expected_response_time,
                    input.api_json_path,
                    input.api_expected_json_value,
                ],
            )?;

            let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = ?1");
            conn.query_row(&sql, params![id], row_to_monitor)
        })
    }

    fn delete_monitor(&self, id: &str) -> SqlResult<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM monitors WHERE id = ?1", params![id])? > 0))
    }

    fn update_monitor_result(&self, id: &str, update: &MonitorResultUpdate) -> SqlResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE monitors SET status = ?1, response_time = ?2, last_checked_at = ?3,
                 ssl_expires_at = COALESCE(?4, ssl_expires_at),
                 ssl_days_until_expiry = COALESCE(?5, ssl_days_until_expiry),
                 ping_packet_loss = COALESCE(?6, ping_packet_loss),
                 keyword_found = COALESCE(?7, keyword_found),
                 actual_status_code = COALESCE(?8, actual_status_code),
                 json_validation_result = COALESCE(?9, json_validation_result)
                 WHERE id = ?10",
                params![
                    update.status.to_string(),
                    update.response_time,
                    update.last_checked_at,
                    update.ssl_expires_at,
                    update.ssl_days_until_expiry,
                    update.ping_packet_loss,
                    update.keyword_found,
                    update.actual_status_code,
                    update.json_validation_result,
                    id,
                ],
            )?;
            Ok(())
        })
    }

    fn update_uptime_percentage(&self, id: &str, pct: f64) -> SqlResult<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE monitors SET uptime_percentage = ?1 WHERE id = ?2", params![pct, id])?;
            Ok(())
        })
    }

    fn insert_log(&self, log: &UptimeLog) -> SqlResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO uptime_logs (id, monitor_id, timestamp, status, response_time, error_message, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    log.id,
                    log.monitor_id,
                    log.timestamp,
                    log.status,
                    log.response_time,
                    log.error_message,
                    log.payload.as_ref().map(|v| v.to_string()),
                ],
            )?;
            Ok(())
        })
    }

    fn find_logs_since(&self, monitor_id: &str, since_rfc3339: &str) -> SqlResult<Vec<UptimeLog>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, monitor_id, timestamp, status, response_time, error_message, payload
                 FROM uptime_logs WHERE monitor_id = ?1 AND timestamp >= ?2 ORDER BY timestamp ASC",
            )?;
            let rows = stmt.query_map(params![monitor_id, since_rfc3339], row_to_log)?;
            rows.collect()
        })
    }

    fn find_alert_settings(&self, monitor_id: &str) -> SqlResult<Option<AlertSettings>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, monitor_id, email, email_enabled, alert_on_down, alert_on_up, created_at
                 FROM alert_settings WHERE monitor_id = ?1",
                params![monitor_id],
                row_to_alert_settings,
            )
            .optional()
        })
    }

    fn create_alert_settings(&self, input: &CreateAlertSettings) -> SqlResult<AlertSettings> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO alert_settings (id, monitor_id, email, email_enabled, alert_on_down, alert_on_up)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, input.monitor_id, input.email, input.email_enabled, input.alert_on_down, input.alert_on_up],
            )?;
            conn.query_row(
                "SELECT id, monitor_id, email, email_enabled, alert_on_down, alert_on_up, created_at
                 FROM alert_settings WHERE id = ?1",
                params![id],
                row_to_alert_settings,
            )
        })
    }

    fn delete_alert_settings(&self, monitor_id: &str) -> SqlResult<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM alert_settings WHERE monitor_id = ?1", params![monitor_id])? > 0))
    }
}

/// Parses a monitor's persisted `status` column back into [`Status`],
/// defaulting to `Unknown` for rows written before a status was ever set.
pub fn parse_status(raw: &str) -> Status {
    Status::from_str(raw).unwrap_or(Status::Unknown)
}
