//! Probe primitives (C1). Each function in this module is a pure check
//! against an external target: no store access, no alerting, nothing but
//! "reach the thing and report what happened". Every primitive absorbs
//! its own failures into the returned `ProbeOutcome` per the propagation
//! policy — callers never match on a probe-specific error type.

pub mod api;
pub mod dns;
pub mod http;
pub mod keyword;
pub mod ping;
pub mod port;
pub mod tls;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
    Warning,
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Up => "up",
            Status::Down => "down",
            Status::Warning => "warning",
            Status::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Status::Up),
            "down" => Ok(Status::Down),
            "warning" => Ok(Status::Warning),
            "unknown" => Ok(Status::Unknown),
            _ => Err(()),
        }
    }
}

/// Result of one probe invocation. `response_time` is seconds, matching
/// the unit the rest of the pipeline (and the store) keeps it in.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: Status,
    pub response_time: Option<f64>,
    pub error_message: Option<String>,
    pub payload: serde_json::Value,
}

impl ProbeOutcome {
    fn up(response_time: Option<f64>, payload: serde_json::Value) -> Self {
        ProbeOutcome {
            status: Status::Up,
            response_time,
            error_message: None,
            payload,
        }
    }

    fn down(message: impl Into<String>) -> Self {
        ProbeOutcome {
            status: Status::Down,
            response_time: None,
            error_message: Some(message.into()),
            payload: serde_json::Value::Null,
        }
    }

    fn down_with(message: impl Into<String>, response_time: Option<f64>, payload: serde_json::Value) -> Self {
        ProbeOutcome {
            status: Status::Down,
            response_time,
            error_message: Some(message.into()),
            payload,
        }
    }

    fn warning(message: impl Into<String>, response_time: Option<f64>, payload: serde_json::Value) -> Self {
        ProbeOutcome {
            status: Status::Warning,
            response_time,
            error_message: Some(message.into()),
            payload,
        }
    }

    fn timeout(deadline: Duration) -> Self {
        ProbeOutcome::down_with("timeout", Some(deadline.as_secs_f64()), serde_json::Value::Null)
    }
}
