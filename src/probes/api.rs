use std::time::{Duration, Instant};

use super::ProbeOutcome;

/// Exercises a JSON API endpoint: status code, optional response-time
/// budget, optional dot-path JSON assertion, evaluated in that order with
/// short-circuit on first failure (§4.1.7).
#[allow(clippy::too_many_arguments)]
pub async fn check(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    headers: Option<&serde_json::Value>,
    body: Option<&str>,
    expected_status: u16,
    expected_response_time: Option<f64>,
    json_path: Option<&str>,
    expected_json_value: Option<&str>,
    timeout: Duration,
) -> ProbeOutcome {
    let start = Instant::now();

    let method_upper = method.to_uppercase();
    let mut req = match method_upper.as_str() {
        "POST" => client.post(url),
        "PUT" => client.put(url),
        "PATCH" => client.patch(url),
        "DELETE" => client.delete(url),
        "HEAD" => client.head(url),
        _ => client.get(url),
    }
    .timeout(timeout);

    if let Some(obj) = headers.and_then(|h| h.as_object()) {
        for (k, v) in obj {
            if let Some(s) = v.as_str() {
                req = req.header(k.as_str(), s);
            }
        }
    }

    if matches!(method_upper.as_str(), "POST" | "PUT" | "PATCH") {
        if let Some(b) = body {
            req = req.body(b.to_string());
        }
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return ProbeOutcome::timeout(timeout),
        Err(e) => return ProbeOutcome::down(format!("request failed: {e}")),
    };

    let status_code = resp.status().as_u16();
    if status_code != expected_status {
        return ProbeOutcome::down_with(
            format!("Expected status {expected_status}, got {status_code}"),
            None,
            serde_json::json!({ "status_code": status_code }),
        );
    }

    let body_text = match resp.text().await {
        Ok(b) => b,
        Err(e) => return ProbeOutcome::down(format!("body read failed: {e}")),
    };
    let elapsed = start.elapsed().as_secs_f64();
    let response_size = body_text.len();

    if let Some(expected_rt) = expected_response_time {
        if elapsed > expected_rt {
            return ProbeOutcome::warning(
                format!("Response time {elapsed:.3}s exceeds {expected_rt:.3}s budget"),
                Some(elapsed),
                serde_json::json!({ "status_code": status_code, "response_size": response_size }),
            );
        }
    }

    if let (Some(path), Some(expected_value)) = (json_path, expected_json_value) {
        match evaluate_json_path(&body_text, path) {
            Ok(actual) if actual == expected_value => {}
            Ok(actual) => {
                return ProbeOutcome::down_with(
                    format!("JSON path '{path}': expected '{expected_value}', got '{actual}'"),
                    Some(elapsed),
                    serde_json::json!({
                        "status_code": status_code,
                        "response_size": response_size,
                        "json_validation_result": false,
                    }),
                );
            }
            Err(e) => {
                return ProbeOutcome::down_with(
                    format!("JSON path '{path}': {e}"),
                    Some(elapsed),
                    serde_json::json!({
                        "status_code": status_code,
                        "response_size": response_size,
                        "json_validation_result": false,
                    }),
                );
            }
        }
    }

    ProbeOutcome::up(
        Some(elapsed),
        serde_json::json!({
            "status_code": status_code,
            "response_size": response_size,
            "json_validation_result": json_path.is_some(),
        }),
    )
}

/// Navigates a dot-separated path of object keys — no array indices, no
/// filters, matching the upstream subset exactly — and stringifies the
/// terminal value for comparison.
fn evaluate_json_path(body: &str, path: &str) -> Result<String, String> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON body: {e}"))?;
    let mut current = &value;
    for segment in path.split('.') {
        current = current
            .get(segment)
            .ok_or_else(|| format!("no such field '{segment}'"))?;
    }
    Ok(match current {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_navigates_nested_objects() {
        let body = r#"{"data":{"status":"ok"}}"#;
        assert_eq!(evaluate_json_path(body, "data.status").unwrap(), "ok");
    }

    #[test]
    fn path_reports_missing_field() {
        let body = r#"{"data":{}}"#;
        assert!(evaluate_json_path(body, "data.status").is_err());
    }
}
