//! Error types for the rendering server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagewire_cache::CacheError;
use pagewire_http::HttpError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while serving a page or API request.
#[derive(Error, Debug)]
pub enum SsrError {
    /// The upstream call failed.
    #[error("upstream error: {0}")]
    Upstream(#[from] HttpError),

    /// The resource id cannot name a single upstream resource.
    #[error("invalid resource id: {0:?}")]
    InvalidResource(String),

    /// The configured upstream base URL is unusable.
    #[error("invalid upstream url: {0}")]
    UpstreamUrl(#[from] url::ParseError),

    /// Page data could not be serialized for the cache or the snapshot.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Page data did not have the expected shape.
    #[error("invalid page data: {0}")]
    Data(#[from] serde_json::Error),

    /// Rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SsrError {
    /// HTTP status to answer with: an upstream 4xx passes through, a bad
    /// resource id is a 400, anything else is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream(err @ HttpError::Client { .. }) => err
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidResource(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SsrError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected upstream");
        }

        let request_id = match &self {
            Self::Upstream(err) => err.request_id().map(|id| id.to_string()),
            _ => None,
        };
        let message = match &self {
            Self::Upstream(HttpError::Client { message, .. }) => message.clone(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                message,
                request_id,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core::RequestId;
    use pagewire_http::{AttemptFailure, ResponseBody};
    use std::time::Duration;

    #[test]
    fn test_client_error_passes_status_through() {
        let err = SsrError::from(HttpError::Client {
            status: 404,
            status_text: "Not Found".to_string(),
            message: "User with id '0' not found".to_string(),
            body: ResponseBody::Text(String::new()),
            url: "https://dummyjson.com/users/0".to_string(),
            request_id: RequestId::from_string("req-0"),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_other_errors_are_500() {
        let err = SsrError::from(HttpError::Server {
            last: AttemptFailure::Timeout(Duration::from_secs(1)),
            attempts: 4,
            url: "https://dummyjson.com/users/1".to_string(),
            request_id: RequestId::from_string("req-1"),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            SsrError::Render("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
