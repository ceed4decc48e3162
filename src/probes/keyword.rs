use std::time::{Duration, Instant};

use regex::Regex;

use super::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Contains,
    Exact,
    Regex,
}

impl MatchType {
    pub fn parse(raw: &str) -> MatchType {
        match raw.to_lowercase().as_str() {
            "exact" => MatchType::Exact,
            "regex" => MatchType::Regex,
            _ => MatchType::Contains,
        }
    }
}

/// Fetches `url` and checks the body against `keyword` per `match_type`
/// (§4.1.6).
pub async fn check(client: &reqwest::Client, url: &str, keyword: &str, match_type: MatchType, timeout: Duration) -> ProbeOutcome {
    let start = Instant::now();

    let resp = match client.get(url).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => return ProbeOutcome::timeout(timeout),
        Err(e) => return ProbeOutcome::down(format!("request failed: {e}")),
    };

    let code = resp.status().as_u16();
    if code != 200 {
        return ProbeOutcome::down(format!("HTTP {code}"));
    }

    let body = match resp.text().await {
        Ok(b) => b,
        Err(e) => return ProbeOutcome::down(format!("body read failed: {e}")),
    };
    let elapsed = start.elapsed().as_secs_f64();

    let (found, match_count) = match match_type {
        MatchType::Contains => (body.contains(keyword), body.matches(keyword).count()),
        MatchType::Exact => {
            let matched = body.trim() == keyword;
            (matched, if matched { 1 } else { 0 })
        }
        MatchType::Regex => match Regex::new(keyword) {
            Ok(re) => {
                let count = re.find_iter(&body).count();
                (count > 0, count)
            }
            Err(e) => return ProbeOutcome::down(format!("invalid keyword regex: {e}")),
        },
    };

    let payload = serde_json::json!({ "keyword_found": found, "match_count": match_count });
    if found {
        ProbeOutcome::up(Some(elapsed), payload)
    } else {
        ProbeOutcome::down_with(format!("Keyword '{keyword}' not found"), Some(elapsed), payload)
    }
}
