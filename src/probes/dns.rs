use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::{Duration, Instant};

use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::{Name, TokioAsyncResolver};

use super::ProbeOutcome;

/// Resolves `hostname` against `resolver_ip` for the given record type and
/// checks the result against an optional expected substring (§4.1.3).
pub async fn check(
    hostname: &str,
    resolver_ip: &str,
    record_type: &str,
    expected_substring: Option<&str>,
    timeout: Duration,
) -> ProbeOutcome {
    let start = Instant::now();

    let resolver = match build_resolver(resolver_ip, timeout) {
        Ok(r) => r,
        Err(e) => return ProbeOutcome::down(e),
    };

    let result = tokio::time::timeout(timeout, lookup(&resolver, hostname, record_type)).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Err(_) => ProbeOutcome::timeout(timeout),
        Ok(Err(e)) => {
            let message = if e.is_nxdomain {
                "Domain does not exist".to_string()
            } else {
                e.message
            };
            ProbeOutcome::down(message)
        }
        Ok(Ok(values)) => {
            let joined = values.join(", ");
            let payload = serde_json::json!({ "dns_result": joined });
            match expected_substring {
                Some(expected) if !joined.contains(expected) => ProbeOutcome::down_with(
                    format!("Expected '{expected}', got: {joined}"),
                    Some(elapsed),
                    payload,
                ),
                _ => ProbeOutcome::up(Some(elapsed), payload),
            }
        }
    }
}

fn build_resolver(resolver_ip: &str, timeout: Duration) -> Result<TokioAsyncResolver, String> {
    let ip = IpAddr::from_str(resolver_ip).map_err(|_| format!("invalid resolver address: {resolver_ip}"))?;
    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    let config = ResolverConfig::from_parts(
        None,
        vec![],
        vec![NameServerConfig {
            socket_addr: SocketAddr::new(ip, 53),
            protocol: Protocol::Udp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        }],
    );
    Ok(TokioAsyncResolver::tokio(config, opts))
}

struct LookupError {
    message: String,
    is_nxdomain: bool,
}

impl From<trust_dns_resolver::error::ResolveError> for LookupError {
    fn from(e: trust_dns_resolver::error::ResolveError) -> Self {
        let is_nxdomain = matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. });
        LookupError { message: format!("DNS lookup failed: {e}"), is_nxdomain }
    }
}

async fn lookup(resolver: &TokioAsyncResolver, hostname: &str, record_type: &str) -> Result<Vec<String>, LookupError> {
    let name = Name::from_ascii(hostname).map_err(|e| LookupError {
        message: format!("invalid hostname: {e}"),
        is_nxdomain: false,
    })?;

    match record_type.to_uppercase().as_str() {
        "A" => Ok(resolver.ipv4_lookup(name).await?.iter().map(|ip| ip.to_string()).collect()),
        "AAAA" => Ok(resolver.ipv6_lookup(name).await?.iter().map(|ip| ip.to_string()).collect()),
        "MX" => Ok(resolver
            .mx_lookup(name)
            .await?
            .iter()
            .map(|mx| format!("{} {}", mx.preference(), mx.exchange()))
            .collect()),
        "TXT" => Ok(resolver.txt_lookup(name).await?.iter().map(|t| t.to_string()).collect()),
        "NS" => Ok(resolver.ns_lookup(name).await?.iter().map(|ns| ns.to_string()).collect()),
        "CNAME" => {
            let response = resolver.lookup(name, RecordType::CNAME).await?;
            Ok(response.iter().map(|r| r.to_string()).collect())
        }
        other => Err(LookupError {
            message: format!("unsupported record type: {other}"),
            is_nxdomain: false,
        }),
    }
}
