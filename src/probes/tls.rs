use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls_pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, X509Certificate};

use super::ProbeOutcome;

fn strip_scheme_and_path(domain: &str) -> String {
    let without_scheme = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    without_scheme.split('/').next().unwrap_or(without_scheme).to_string()
}

fn tls_config() -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Connects to `domain:443`, completes a TLS handshake, and reports the
/// leaf certificate's expiry relative to `threshold_days` (§4.1.2).
pub async fn check(raw_domain: &str, timeout: Duration, threshold_days: i64) -> ProbeOutcome {
    let domain = strip_scheme_and_path(raw_domain);
    let addr = format!("{domain}:443");

    let result = tokio::time::timeout(timeout, connect_and_inspect(&domain, &addr)).await;

    match result {
        Err(_) => ProbeOutcome::timeout(timeout),
        Ok(Err(e)) => ProbeOutcome::down(e),
        Ok(Ok(not_after)) => {
            let days_left = (not_after - Utc::now()).num_days();
            let payload = serde_json::json!({
                "ssl_expires_at": not_after.to_rfc3339(),
                "ssl_days_until_expiry": days_left,
            });
            if days_left < 0 {
                ProbeOutcome::down_with(
                    format!("Certificate expired {} days ago", -days_left),
                    None,
                    payload,
                )
            } else if days_left <= threshold_days {
                ProbeOutcome::warning(format!("Certificate expires in {days_left} days"), None, payload)
            } else {
                ProbeOutcome::up(None, payload)
            }
        }
    }
}

async fn connect_and_inspect(domain: &str, addr: &str) -> Result<DateTime<Utc>, String> {
    let tcp = TcpStream::connect(addr).await.map_err(|e| format!("connect failed: {e}"))?;
    let connector = TlsConnector::from(tls_config());
    let server_name =
        ServerName::try_from(domain.to_string()).map_err(|_| format!("invalid domain name: {domain}"))?;

    let tls_stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| format!("TLS handshake failed: {e}"))?;

    let (_, conn) = tls_stream.get_ref();
    let certs = conn.peer_certificates().ok_or_else(|| "no peer certificate presented".to_string())?;
    let leaf = certs.first().ok_or_else(|| "empty certificate chain".to_string())?;

    let (_, parsed) = X509Certificate::from_der(leaf.as_ref()).map_err(|e| format!("certificate parse failed: {e}"))?;
    let not_after = parsed.validity().not_after;
    DateTime::from_timestamp(not_after.timestamp(), 0).ok_or_else(|| "certificate has an unrepresentable expiry".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_path() {
        assert_eq!(strip_scheme_and_path("https://example.com/health"), "example.com");
        assert_eq!(strip_scheme_and_path("example.com"), "example.com");
    }
}
