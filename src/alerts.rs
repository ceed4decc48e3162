use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::db::Store;
use crate::email::{render, AlertDirection, EmailTransport};
use crate::models::Monitor;
use crate::probes::Status;

/// Emitted by the check pipeline (§4.3 step 7) whenever a monitor's
/// status changes away from a known prior value.
pub struct StateChangeEvent {
    pub monitor: Monitor,
    pub previous_status: Status,
    pub new_status: Status,
}

/// Consumes state-change events off a channel and renders/sends alert
/// emails (§4.5). Runs as an independent task so a slow or unreachable
/// SMTP server never blocks the probe pipeline that fed it.
pub struct AlertDispatcher {
    store: Arc<dyn Store>,
    transport: Arc<dyn EmailTransport>,
}

impl AlertDispatcher {
    pub fn new(store: Arc<dyn Store>, transport: Arc<dyn EmailTransport>) -> Self {
        AlertDispatcher { store, transport }
    }

    /// Runs until the channel's senders are all dropped (engine stop).
    pub async fn run(self, mut events: mpsc::Receiver<StateChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
    }

    async fn handle(&self, event: StateChangeEvent) {
        let settings = match self.store.find_alert_settings(&event.monitor.id) {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, monitor_id = %event.monitor.id, "failed to load alert settings");
                return;
            }
        };

        if !settings.email_enabled {
            return;
        }

        let direction = match qualifying_direction(event.previous_status, event.new_status, settings.alert_on_down, settings.alert_on_up) {
            Some(d) => d,
            None => return,
        };

        let status_label = event.new_status.to_string();
        let timestamp = Utc::now().to_rfc3339();
        let (subject, text_body, html_body) = render(
            &direction,
            &event.monitor.name,
            event.monitor.representative_url(),
            &status_label,
            &timestamp,
        );

        self.transport.send(&settings.email, &subject, &text_body, &html_body).await;
        info!(monitor_id = %event.monitor.id, email = %settings.email, status = %status_label, "alert email sent");
    }
}

/// Qualifying transitions (§4.5). `previous_status` is assumed already
/// filtered to exclude `unknown` by the caller (§4.3 step 7).
fn qualifying_direction(previous: Status, new: Status, alert_on_down: bool, alert_on_up: bool) -> Option<AlertDirection> {
    match new {
        Status::Down | Status::Warning if alert_on_down => Some(AlertDirection::Down),
        Status::Up if alert_on_up && matches!(previous, Status::Down | Status::Warning) => Some(AlertDirection::Recovery),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_transition_qualifies_with_alert_on_down() {
        assert!(qualifying_direction(Status::Up, Status::Down, true, true).is_some());
        assert!(qualifying_direction(Status::Up, Status::Down, false, true).is_none());
    }

    #[test]
    fn warning_piggybacks_on_down_channel() {
        assert!(qualifying_direction(Status::Up, Status::Warning, true, true).is_some());
    }

    #[test]
    fn recovery_requires_prior_down_or_warning() {
        assert!(qualifying_direction(Status::Down, Status::Up, true, true).is_some());
        assert!(qualifying_direction(Status::Warning, Status::Up, true, true).is_some());
        assert!(qualifying_direction(Status::Unknown, Status::Up, true, true).is_none());
    }

    #[test]
    fn recovery_requires_alert_on_up() {
        assert!(qualifying_direction(Status::Down, Status::Up, true, false).is_none());
    }
}
