use std::time::{Duration, Instant};

use super::ProbeOutcome;

/// Single GET, UP iff the response status is exactly 200 (§4.1.1).
///
/// `client` is expected to already be configured with the desired
/// redirect policy (default: follow) — reqwest has no per-request
/// override, so callers that need "don't follow" pass a client built
/// with `redirect::Policy::none()`.
pub async fn check(client: &reqwest::Client, url: &str, timeout: Duration) -> ProbeOutcome {
    let start = Instant::now();

    match client.get(url).timeout(timeout).send().await {
        Ok(resp) => {
            let elapsed = start.elapsed().as_secs_f64();
            let code = resp.status().as_u16();
            if code == 200 {
                ProbeOutcome::up(Some(elapsed), serde_json::json!({ "status_code": code }))
            } else {
                ProbeOutcome::down_with(format!("HTTP {code}"), Some(elapsed), serde_json::json!({ "status_code": code }))
            }
        }
        Err(e) if e.is_timeout() => ProbeOutcome::timeout(timeout),
        Err(e) => ProbeOutcome::down(format!("request failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn up_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = check(&client, &server.uri(), Duration::from_secs(5)).await;
        assert_eq!(outcome.status, super::super::Status::Up);
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn down_on_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let outcome = check(&client, &server.uri(), Duration::from_secs(5)).await;
        assert_eq!(outcome.status, super::super::Status::Down);
        assert_eq!(outcome.error_message.as_deref(), Some("HTTP 500"));
    }
}
