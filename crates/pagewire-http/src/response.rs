//! HTTP response handling.

use std::time::Duration;

use pagewire_cache::CacheStatus;
use pagewire_core::{Headers, RequestId};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A response body, classified by content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed `application/json` body (`null` when empty).
    Json(Value),
    /// Any other body, as text.
    Text(String),
}

impl ResponseBody {
    /// Parse a success body: JSON content types must parse.
    pub fn parse(content_type: Option<&str>, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if is_json(content_type) {
            if bytes.is_empty() {
                return Ok(Self::Json(Value::Null));
            }
            return serde_json::from_slice(bytes).map(Self::Json);
        }
        Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// Parse an error body: JSON when possible, otherwise raw text.
    pub fn parse_lossy(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes)
            .map(Self::Json)
            .unwrap_or_else(|_| Self::Text(String::from_utf8_lossy(bytes).into_owned()))
    }

    /// Convert into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Decode into a typed value.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }

    /// The text of a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Human-readable failure message: `message`, then `error`, then `HTTP <status>`.
    pub fn error_message(&self, status: u16) -> String {
        if let Self::Json(value) = self {
            for field in ["message", "error"] {
                if let Some(text) = value.get(field).and_then(Value::as_str) {
                    return text.to_string();
                }
            }
        }
        format!("HTTP {}", status)
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// A successful HTTP outcome.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The classified body.
    pub data: ResponseBody,
    /// The HTTP status code.
    pub status: u16,
    /// The status reason phrase.
    pub status_text: String,
    /// The response headers as received from the transport.
    pub headers: Headers,
    /// Trace id of the request.
    pub request_id: RequestId,
    /// Time from the start of the call to the response.
    pub duration: Duration,
    /// Whether the response came from the cache.
    pub cache: CacheStatus,
}

impl HttpResponse {
    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        header_value(&self.headers, key)
    }

    /// Duration in whole milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a Headers, key: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}
