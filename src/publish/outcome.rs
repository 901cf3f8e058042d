use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::publish::transport::{TransportError, WebhookResponse};

/// Upper bound on the message kept from a webhook response body.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// JSON fields checked, in order, for a human readable error.
const MESSAGE_FIELDS: [&str; 3] = ["message", "error", "msg"];

/// A changed file together with the webhook it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookTarget {
    pub path: String,
    pub url: String,
}

/// Terminal outcome of one dispatch. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub path: String,
    pub url: String,
    /// `None` when no response was received at all.
    pub status: Option<u16>,
    pub succeeded: bool,
    pub message: String,
}

impl DispatchResult {
    pub fn status_description(&self) -> String {
        match self.status {
            Some(code) if self.succeeded => format!("HTTP {code}"),
            Some(code) => format!("HTTP {code}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// 2xx is a success, any other status or a transport error is a failure.
pub fn classify(
    target: &WebhookTarget,
    outcome: Result<WebhookResponse, TransportError>,
) -> DispatchResult {
    let (status, succeeded, message) = match outcome {
        Ok(resp) if (200..300).contains(&resp.status) => {
            (Some(resp.status), true, format!("HTTP {}", resp.status))
        }
        Ok(resp) => (
            Some(resp.status),
            false,
            extract_message(resp.status, &resp.body),
        ),
        Err(e) => {
            let msg = e.to_string();
            let msg = if msg.trim().is_empty() {
                "request failed without a description".to_string()
            } else {
                msg
            };
            (None, false, truncate(&msg, MAX_MESSAGE_CHARS))
        }
    };

    DispatchResult {
        path: target.path.clone(),
        url: target.url.clone(),
        status,
        succeeded,
        message,
    }
}

/// Best effort error text out of a failed response body.
///
/// Prefers `message`, `error` then `msg` from a JSON object, falls back to
/// the raw body, then to the status reason phrase.
pub fn extract_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in MESSAGE_FIELDS {
            match map.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    return truncate(s.trim(), MAX_MESSAGE_CHARS);
                }
                Some(Value::Null) | None => {}
                Some(Value::String(_)) => {}
                Some(other) => return truncate(&other.to_string(), MAX_MESSAGE_CHARS),
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return truncate(body, MAX_MESSAGE_CHARS);
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
