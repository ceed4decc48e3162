use std::time::{Duration, Instant};

use tokio::net::{TcpStream, UdpSocket};

use super::ProbeOutcome;

/// Opens (and for TCP, immediately closes) a connection to `host:port`
/// (§4.1.4). UDP reachability can't be asserted — any non-error connect
/// counts as UP.
pub async fn check(host: &str, port: u16, protocol: &str, timeout: Duration) -> ProbeOutcome {
    let start = Instant::now();
    match protocol.to_lowercase().as_str() {
        "tcp" => check_tcp(host, port, timeout, start).await,
        "udp" => check_udp(host, port, timeout, start).await,
        other => ProbeOutcome::down(format!("unsupported port protocol: {other}")),
    }
}

async fn check_tcp(host: &str, port: u16, timeout: Duration, start: Instant) -> ProbeOutcome {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => {
            let elapsed = start.elapsed().as_secs_f64();
            ProbeOutcome::up(Some(elapsed), serde_json::json!({ "port_open": true }))
        }
        Ok(Err(e)) => ProbeOutcome::down_with(
            format!("TCP connect failed: {e}"),
            None,
            serde_json::json!({ "port_open": false }),
        ),
        Err(_) => ProbeOutcome::timeout(timeout),
    }
}

async fn check_udp(host: &str, port: u16, timeout: Duration, start: Instant) -> ProbeOutcome {
    let addr = format!("{host}:{port}");
    let attempt = async {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| e.to_string())?;
        socket.connect(&addr).await.map_err(|e| e.to_string())?;
        Ok::<(), String>(())
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(())) => {
            let elapsed = start.elapsed().as_secs_f64();
            ProbeOutcome::up(Some(elapsed), serde_json::json!({ "port_open": true }))
        }
        Ok(Err(e)) => ProbeOutcome::down_with(format!("UDP connect failed: {e}"), None, serde_json::json!({ "port_open": false })),
        Err(_) => ProbeOutcome::timeout(timeout),
    }
}
