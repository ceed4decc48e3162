use async_trait::async_trait;
use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

/// Outbound mail, abstracted so the alert dispatcher can be tested
/// without a network-reachable SMTP server (§6, §9 "SMTP as a pluggable
/// transport").
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str);
}

pub struct SmtpEmailTransport {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    from_name: String,
}

impl SmtpEmailTransport {
    /// Builds the transport from environment configuration (§10.3). Any
    /// missing piece of SMTP config degrades `send` to a logged no-op
    /// rather than a startup failure, so the rest of the service runs
    /// fine in environments that never configure outbound mail.
    pub fn from_env() -> Self {
        let host = std::env::var("SMTP_HOST").ok();
        let port: Option<u16> = std::env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok());
        let user = std::env::var("SMTP_USER").ok();
        let password = std::env::var("SMTP_PASSWORD").ok();
        let from_address = std::env::var("SMTP_FROM_ADDRESS").unwrap_or_else(|_| "alerts@probewatch.local".into());
        let from_name = std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "ProbeWatch".into());

        let mailer = match (host, port, user, password) {
            (Some(host), Some(port), Some(user), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
                    .ok()
                    .map(|builder| {
                        builder
                            .port(port)
                            .credentials(Credentials::new(user, password))
                            .build()
                    })
            }
            _ => {
                warn!("SMTP not fully configured; alert emails will be logged and dropped");
                None
            }
        };

        SmtpEmailTransport { mailer, from_address, from_name }
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) {
        let Some(mailer) = &self.mailer else {
            warn!(%to, %subject, "SMTP transport not configured, dropping alert email");
            return;
        };

        let from = format!("{} <{}>", self.from_name, self.from_address);
        let message = Message::builder()
            .from(match from.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!(error = %e, "invalid SMTP_FROM_ADDRESS/SMTP_FROM_NAME, dropping alert email");
                    return;
                }
            })
            .to(match to.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!(error = %e, %to, "invalid alert recipient address, dropping alert email");
                    return;
                }
            })
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text_body.to_string()))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html_body.to_string())),
            );

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to build alert email");
                return;
            }
        };

        // Failure is logged and swallowed (§4.5, §7): a slow or
        // unreachable SMTP server must never propagate back into the
        // check pipeline.
        if let Err(e) = mailer.send(message).await {
            warn!(error = %e, %to, "failed to send alert email");
        }
    }
}

/// Which direction the alert is: down (red theme) or recovery (green
/// theme), matching the upstream template split.
pub enum AlertDirection {
    Down,
    Recovery,
}

pub fn render(direction: &AlertDirection, monitor_name: &str, representative_url: &str, status_label: &str, timestamp_utc: &str) -> (String, String, String) {
    let (subject_prefix, emoji, color) = match direction {
        AlertDirection::Down => ("ALERT", "\u{1F534}", "#dc2626"),
        AlertDirection::Recovery => ("RECOVERY", "\u{1F7E2}", "#16a34a"),
    };

    let subject = format!("{subject_prefix}: {monitor_name} is {status_label}");

    let text_body = format!(
        "{subject_prefix}: {monitor_name}\n\nTarget: {representative_url}\nStatus: {status_label}\nTime (UTC): {timestamp_utc}\n"
    );

    let html_body = format!(
        "<html><body style=\"font-family:sans-serif\">\
         <h2 style=\"color:{color}\">{emoji} {subject_prefix}: {monitor_name}</h2>\
         <p><strong>Target:</strong> {representative_url}</p>\
         <p><strong>Status:</strong> {status_label}</p>\
         <p><strong>Time (UTC):</strong> {timestamp_utc}</p>\
         </body></html>"
    );

    (subject, text_body, html_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTransport {
        sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send(&self, to: &str, subject: &str, _text_body: &str, _html_body: &str) {
            self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
        }
    }

    #[tokio::test]
    async fn records_send_calls() {
        let transport = RecordingTransport { sent: std::sync::Mutex::new(vec![]) };
        transport.send("a@b.com", "ALERT: x is down", "text", "<html></html>").await;
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn down_render_uses_red_theme_and_alert_prefix() {
        let (subject, _, html) = render(&AlertDirection::Down, "Home", "https://example.com", "down", "2026-01-01T00:00:00Z");
        assert!(subject.starts_with("ALERT"));
        assert!(html.contains("#dc2626"));
    }

    #[test]
    fn recovery_render_uses_green_theme() {
        let (subject, _, html) = render(&AlertDirection::Recovery, "Home", "https://example.com", "up", "2026-01-01T00:00:00Z");
        assert!(subject.starts_with("RECOVERY"));
        assert!(html.contains("#16a34a"));
    }
}
