//! Classification of raw responses into `RequestOutcome` values.
//!
//! # Design
//! Every failure that happens after a request is handed to the transport is
//! returned as data. `FailureKind` records which check failed so callers can
//! branch without parsing `error_message`.

use serde_json::Value;

use crate::error::TransportError;
use crate::http::HttpResponse;

pub const NON_JSON_MESSAGE: &str = "unexpected non-JSON response";

/// Why a request did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received.
    Transport,
    /// The body was markup (typically an HTML error page) instead of JSON.
    Protocol,
    /// The decoded body carried an `error` or `errors` field.
    Application,
    /// The status code was outside 200, 201, 202.
    Status,
}

/// The classified result of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    /// `0` when the transport failed before a status was received.
    pub http_status: u16,
    pub raw_body: String,
    pub decoded_body: Option<Value>,
    pub error_message: Option<String>,
    pub failure: Option<FailureKind>,
}

impl RequestOutcome {
    pub fn transport_failure(err: &TransportError) -> Self {
        Self {
            success: false,
            http_status: 0,
            raw_body: String::new(),
            decoded_body: None,
            error_message: Some(err.to_string()),
            failure: Some(FailureKind::Transport),
        }
    }

    /// Classify a response that reached us.
    pub fn from_response(response: HttpResponse) -> Self {
        let HttpResponse { status, body, .. } = response;

        let decoded_body = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&body).ok()
        };

        if decoded_body.is_none() && contains_markup(&body) {
            return Self {
                success: false,
                http_status: status,
                raw_body: body,
                decoded_body: None,
                error_message: Some(NON_JSON_MESSAGE.to_string()),
                failure: Some(FailureKind::Protocol),
            };
        }

        if let Some(message) = decoded_body.as_ref().and_then(application_error) {
            return Self {
                success: false,
                http_status: status,
                raw_body: body,
                decoded_body,
                error_message: Some(message),
                failure: Some(FailureKind::Application),
            };
        }

        let success = matches!(status, 200 | 201 | 202);
        Self {
            success,
            http_status: status,
            raw_body: body,
            decoded_body,
            error_message: (!success).then(|| format!("unexpected HTTP status {status}")),
            failure: (!success).then_some(FailureKind::Status),
        }
    }
}

/// Extract a message from a top-level `error` or `errors` field.
fn application_error(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    let field = ["errors", "error"]
        .into_iter()
        .filter_map(|key| object.get(key))
        .find(|v| is_reported(v))?;
    let message = flatten_message(field);
    Some(if message.is_empty() {
        "the API reported an error".to_string()
    } else {
        message
    })
}

/// Null fields and empty lists do not report anything.
fn is_reported(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn flatten_message(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(flatten_message)
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(fields) => match fields.get("error").or_else(|| fields.get("message")) {
            Some(inner) => flatten_message(inner),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// True when the text contains something that looks like an HTML/XML tag.
///
/// Linear: a tag opener only counts if some `>` follows it, so it is enough
/// to look for an opener before the last `>`.
fn contains_markup(text: &str) -> bool {
    let bytes = text.as_bytes();
    let Some(last_close) = bytes.iter().rposition(|&b| b == b'>') else {
        return false;
    };
    bytes[..last_close].windows(2).any(|pair| {
        pair[0] == b'<' && (pair[1].is_ascii_alphabetic() || matches!(pair[1], b'/' | b'!' | b'?'))
    })
}
