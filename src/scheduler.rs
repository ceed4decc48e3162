use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::alerts::StateChangeEvent;
use crate::db::{parse_status, MonitorResultUpdate, Store};
use crate::models::{Monitor, UptimeLog};
use crate::probes::keyword::MatchType;
use crate::probes::{self, Status};

/// Default scheduler cadence (§4.2). Overridable via `SCHEDULER_TICK_SECONDS`.
pub const DEFAULT_TICK_SECONDS: u64 = 30;

/// Drives the periodic scan (C3) and owns the in-flight set that enforces
/// at-most-one-probe-per-monitor (§4.2, §5, P8).
pub struct Scheduler {
    store: Arc<dyn Store>,
    clients: ProbeClients,
    alert_tx: mpsc::Sender<StateChangeEvent>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    tick: Duration,
}

/// Shared `reqwest::Client` used by every HTTP-shaped probe (http, api,
/// keyword). Built once and reused so connection pooling works across
/// monitors, matching the teacher's shared-client pattern.
#[derive(Clone)]
pub struct ProbeClients {
    pub follow: reqwest::Client,
}

impl ProbeClients {
    pub fn build() -> Self {
        ProbeClients {
            follow: reqwest::Client::builder().build().expect("failed to build HTTP client"),
        }
    }
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, clients: ProbeClients, alert_tx: mpsc::Sender<StateChangeEvent>, tick: Duration) -> Self {
        Scheduler {
            store,
            clients,
            alert_tx,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tick,
        }
    }

    /// The in-flight set shared with the manual-check API route, so a
    /// manual check and a scheduled probe for the same monitor can never
    /// interleave (§4.3 Design Note c, P8).
    pub fn in_flight(&self) -> Arc<Mutex<HashSet<String>>> {
        self.in_flight.clone()
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub fn clients(&self) -> ProbeClients {
        self.clients.clone()
    }

    pub fn alert_sender(&self) -> mpsc::Sender<StateChangeEvent> {
        self.alert_tx.clone()
    }

    /// Runs ticks until `cancel` fires. If a scan overruns the tick
    /// cadence, the next scan starts immediately rather than compounding
    /// the lag (§4.2).
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let scan = self.run_tick();
            tokio::select! {
                _ = scan => {}
                _ = cancel.cancelled() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = cancel.cancelled() => break,
            }
        }
        debug!("scheduler loop exited");
    }

    async fn run_tick(self: &Arc<Self>) {
        let monitors = match self.store.list_monitors() {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to list monitors this tick; will retry next tick");
                return;
            }
        };

        let mut dispatched = 0;
        let mut skipped = 0;

        for monitor in monitors {
            if !is_due(&monitor) {
                continue;
            }

            let mut guard = self.in_flight.lock().unwrap();
            if guard.contains(&monitor.id) {
                skipped += 1;
                continue;
            }
            guard.insert(monitor.id.clone());
            drop(guard);
            dispatched += 1;

            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.run_check(monitor).await;
            });
        }

        debug!(dispatched, skipped, "scheduler tick complete");
    }

    async fn run_check(self: &Arc<Self>, monitor: Monitor) {
        let monitor_id = monitor.id.clone();
        let outcome = run_single_check(&self.store, &self.clients, &monitor).await;
        self.in_flight.lock().unwrap().remove(&monitor_id);

        if let Some((previous_status, new_status)) = outcome {
            if previous_status != Status::Unknown && previous_status != new_status {
                if let Ok(Some(refreshed)) = self.store.get_monitor(&monitor_id) {
                    let _ = self
                        .alert_tx
                        .send(StateChangeEvent { monitor: refreshed, previous_status, new_status })
                        .await;
                }
            }
        }
    }
}

fn is_due(monitor: &Monitor) -> bool {
    match &monitor.last_checked_at {
        None => true,
        Some(ts) => match chrono::DateTime::parse_from_rfc3339(ts) {
            Ok(last) => {
                let elapsed = Utc::now().signed_duration_since(last.with_timezone(&Utc));
                elapsed.num_seconds() >= monitor.interval_seconds as i64
            }
            Err(_) => true,
        },
    }
}

/// Runs the full check pipeline (§4.3 steps 1-6) for one monitor: dispatch
/// to the right probe, persist the update + log, recompute uptime.
/// Returns `(previous_status, new_status)` so the caller decides whether
/// to emit a state-change event — the scheduler does; the manual-check
/// API route deliberately does not (§9 Design Note a).
pub async fn run_single_check(store: &Arc<dyn Store>, clients: &ProbeClients, monitor: &Monitor) -> Option<(Status, Status)> {
    let previous_status = parse_status(&monitor.status);
    let timeout = Duration::from_secs(monitor.timeout_seconds as u64);

    let outcome = dispatch_probe(clients, monitor, timeout).await;
    let now = Utc::now().to_rfc3339();

    // Only these four kinds cache a field back onto the monitor row, mirroring
    // the original's per-branch `update_data` assignment (§4.3 step 3); every
    // other kind's detail lives solely in the log payload below.
    let (ssl_expires_at, ssl_days_until_expiry) = if monitor.kind == "ssl" {
        (
            outcome.payload.get("ssl_expires_at").and_then(|v| v.as_str()).map(|s| s.to_string()),
            outcome.payload.get("ssl_days_until_expiry").and_then(|v| v.as_i64()),
        )
    } else {
        (None, None)
    };
    let ping_packet_loss = if monitor.kind == "ping" {
        outcome.payload.get("ping_packet_loss").and_then(|v| v.as_f64())
    } else {
        None
    };
    let keyword_found = if monitor.kind == "keyword" {
        outcome.payload.get("keyword_found").and_then(|v| v.as_bool())
    } else {
        None
    };
    let (actual_status_code, json_validation_result) = if monitor.kind == "api" {
        (
            outcome.payload.get("status_code").and_then(|v| v.as_u64()).map(|v| v as u16),
            outcome.payload.get("json_validation_result").and_then(|v| v.as_bool()),
        )
    } else {
        (None, None)
    };

    let update = MonitorResultUpdate {
        status: outcome.status,
        response_time: outcome.response_time,
        last_checked_at: now.clone(),
        ssl_expires_at,
        ssl_days_until_expiry,
        ping_packet_loss,
        keyword_found,
        actual_status_code,
        json_validation_result,
    };

    if let Err(e) = store.update_monitor_result(&monitor.id, &update) {
        warn!(error = %e, monitor_id = %monitor.id, "failed to persist monitor update");
        return None;
    }

    let log = UptimeLog {
        id: Uuid::new_v4().to_string(),
        monitor_id: monitor.id.clone(),
        timestamp: now,
        status: outcome.status.to_string(),
        response_time: outcome.response_time,
        error_message: outcome.error_message,
        payload: Some(outcome.payload),
    };
    if let Err(e) = store.insert_log(&log) {
        warn!(error = %e, monitor_id = %monitor.id, "failed to persist uptime log");
    }

    if let Err(e) = crate::uptime::recompute(store.as_ref(), &monitor.id) {
        warn!(error = %e, monitor_id = %monitor.id, "failed to recompute uptime percentage");
    }

    Some((previous_status, outcome.status))
}

async fn dispatch_probe(clients: &ProbeClients, monitor: &Monitor, timeout: Duration) -> probes::ProbeOutcome {
    match monitor.kind.as_str() {
        "http" | "https" => {
            let url = monitor.url.as_deref().unwrap_or_default();
            probes::http::check(&clients.follow, url, timeout).await
        }
        "ssl" => {
            let domain = monitor.ssl_domain.as_deref().unwrap_or_default();
            let threshold = monitor.ssl_expiry_threshold_days.unwrap_or(30);
            probes::tls::check(domain, timeout, threshold).await
        }
        "dns" => {
            let hostname = monitor.dns_hostname.as_deref().unwrap_or_default();
            let resolver = monitor.dns_server.as_deref().unwrap_or("8.8.8.8");
            let record_type = monitor.dns_record_type.as_deref().unwrap_or("A");
            probes::dns::check(hostname, resolver, record_type, monitor.expected_dns_result.as_deref(), timeout).await
        }
        "port" => {
            let host = monitor.port_host.as_deref().unwrap_or_default();
            let port = monitor.port_number.unwrap_or(0);
            let protocol = monitor.port_protocol.as_deref().unwrap_or("tcp");
            probes::port::check(host, port, protocol, timeout).await
        }
        "ping" => {
            let host = monitor.ping_host.as_deref().unwrap_or_default();
            let count = monitor.ping_count.unwrap_or(4);
            let size = monitor.ping_packet_size.unwrap_or(32) as usize;
            probes::ping::check(host, count, size, timeout).await
        }
        "keyword" => {
            let url = monitor.keyword_url.as_deref().unwrap_or_default();
            let keyword = monitor.keyword_text.as_deref().unwrap_or_default();
            let match_type = MatchType::parse(monitor.keyword_match_type.as_deref().unwrap_or("contains"));
            probes::keyword::check(&clients.follow, url, keyword, match_type, timeout).await
        }
        "api" => {
            let url = monitor.api_url.as_deref().unwrap_or_default();
            let method = monitor.api_method.as_deref().unwrap_or("GET");
            probes::api::check(
                &clients.follow,
                url,
                method,
                monitor.api_headers.as_ref(),
                monitor.api_body.as_deref(),
                monitor.api_expected_status.unwrap_or(200),
                monitor.api_expected_response_time,
                monitor.api_json_path.as_deref(),
                monitor.api_expected_json_value.as_deref(),
                timeout,
            )
            .await
        }
        other => probes::ProbeOutcome {
            status: Status::Down,
            response_time: None,
            error_message: Some(format!("unknown monitor kind: {other}")),
            payload: serde_json::Value::Null,
        },
    }
}
