use std::net::IpAddr;
use std::time::{Duration, Instant};

use surge_ping::{Client, Config, IcmpPacket, PingIdentifier, PingSequence, SurgeError, ICMP};

use super::ProbeOutcome;

/// Sends `count` ICMP echo requests of `packet_size` bytes to `host` and
/// classifies the outcome by packet loss (§4.1.5). Uses unprivileged ICMP
/// sockets via `surge-ping` rather than shelling out to a system `ping`.
pub async fn check(host: &str, count: u32, packet_size: usize, timeout: Duration) -> ProbeOutcome {
    let ip = match resolve(host).await {
        Ok(ip) => ip,
        Err(e) => return ProbeOutcome::down(e),
    };

    let config = if ip.is_ipv6() {
        Config::builder().kind(ICMP::V6).build()
    } else {
        Config::builder().kind(ICMP::V4).build()
    };

    let client = match Client::new(&config) {
        Ok(c) => c,
        Err(e) => return ProbeOutcome::down(format!("failed to open ICMP socket: {e}")),
    };

    let mut pinger = client.pinger(ip, PingIdentifier(rand_identifier())).await;
    pinger.timeout(timeout);
    let payload = vec![0u8; packet_size];

    let mut round_trips_ms: Vec<f64> = Vec::with_capacity(count as usize);
    let mut lost = 0u32;

    for seq in 0..count {
        match pinger.ping(PingSequence(seq as u16), &payload).await {
            Ok((IcmpPacket::V4(_), dur)) | Ok((IcmpPacket::V6(_), dur)) => {
                round_trips_ms.push(dur.as_secs_f64() * 1000.0);
            }
            Err(SurgeError::Timeout { .. }) => lost += 1,
            Err(_) => lost += 1,
        }
    }

    let sent = count.max(1) as f64;
    let loss_pct = (lost as f64 / sent) * 100.0;

    if round_trips_ms.is_empty() {
        return ProbeOutcome::down_with(
            "100% packet loss".to_string(),
            None,
            serde_json::json!({ "ping_packet_loss": 100.0 }),
        );
    }

    let min_ms = round_trips_ms.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_ms = round_trips_ms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let avg_ms = round_trips_ms.iter().sum::<f64>() / round_trips_ms.len() as f64;

    let payload = serde_json::json!({
        "ping_packet_loss": loss_pct,
        "rtt_min_s": min_ms / 1000.0,
        "rtt_avg_s": avg_ms / 1000.0,
        "rtt_max_s": max_ms / 1000.0,
    });
    let response_time = Some(avg_ms / 1000.0);

    if loss_pct == 0.0 {
        ProbeOutcome::up(response_time, payload)
    } else {
        ProbeOutcome::warning(format!("{loss_pct:.0}% packet loss"), response_time, payload)
    }
}

async fn resolve(host: &str) -> Result<IpAddr, String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| format!("could not resolve {host}: {e}"))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| format!("no address found for {host}"))
}

fn rand_identifier() -> u16 {
    use std::time::{SystemTime, UNIX_EPOCH};
    (SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos() & 0xffff) as u16
}
