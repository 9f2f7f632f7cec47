//! HTTP client error types.

use std::time::Duration;

use pagewire_core::RequestId;
use thiserror::Error;

use crate::response::ResponseBody;

/// Why a single attempt failed.
#[derive(Error, Debug, Clone)]
pub enum AttemptFailure {
    /// The upstream answered with a 5xx status.
    #[error("HTTP {status} {status_text}: {message}")]
    Status {
        status: u16,
        status_text: String,
        message: String,
        body: ResponseBody,
    },

    /// The attempt exceeded its timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
}

/// Errors returned by [`crate::HttpClient`].
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    /// The upstream rejected the request (4xx). Never retried.
    #[error("{message} (HTTP {status} {status_text}, request {request_id})")]
    Client {
        status: u16,
        status_text: String,
        message: String,
        body: ResponseBody,
        url: String,
        request_id: RequestId,
    },

    /// 5xx, timeout or network failure that survived every retry.
    #[error("request to {url} failed after {attempts} attempt(s): {last}")]
    Server {
        last: AttemptFailure,
        attempts: u32,
        url: String,
        request_id: RequestId,
    },

    /// The request could not be built; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A successful response did not match the expected shape.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        message: String,
        url: String,
        request_id: RequestId,
    },
}

impl HttpError {
    /// Status to report for this error.
    ///
    /// Exhausted retries report the upstream status when the last attempt got
    /// one, and 500 otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } => Some(*status),
            Self::Server { last, .. } => match last {
                AttemptFailure::Status { status, .. } => Some(*status),
                _ => Some(500),
            },
            Self::InvalidRequest(_) | Self::Decode { .. } => None,
        }
    }

    /// Trace id of the failed request, if it got that far.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::Client { request_id, .. }
            | Self::Server { request_id, .. }
            | Self::Decode { request_id, .. } => Some(request_id),
            Self::InvalidRequest(_) => None,
        }
    }

    /// The error body returned by the upstream, if any.
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            Self::Client { body, .. } => Some(body),
            Self::Server {
                last: AttemptFailure::Status { body, .. },
                ..
            } => Some(body),
            _ => None,
        }
    }

    /// Check if this is a client (4xx) error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// Check if this is an upstream/server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}
