//! Instrumentation and auth extension points.

use std::time::Duration;

use async_trait::async_trait;
use pagewire_core::Headers;

use crate::error::HttpError;
use crate::transport::{TransportRequest, TransportResponse};

/// Observes each attempt of a request.
///
/// Errors returned from a hook are logged and ignored; they never fail the
/// request.
#[async_trait]
pub trait RequestHooks: Send + Sync {
    /// Called before each attempt is sent.
    async fn on_request(&self, _request: &TransportRequest) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every response received, including error statuses.
    async fn on_response(
        &self,
        _response: &TransportResponse,
        _elapsed: Duration,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every failed attempt.
    async fn on_error(&self, _url: &str, _error: &HttpError) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hooks that log every attempt via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

#[async_trait]
impl RequestHooks for LoggingHooks {
    async fn on_request(&self, request: &TransportRequest) -> anyhow::Result<()> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            request_id = request.header("x-request-id").unwrap_or_default(),
            "sending request"
        );
        Ok(())
    }

    async fn on_response(
        &self,
        response: &TransportResponse,
        elapsed: Duration,
    ) -> anyhow::Result<()> {
        tracing::debug!(
            status = response.status,
            duration_ms = elapsed.as_millis() as u64,
            "received response"
        );
        Ok(())
    }

    async fn on_error(&self, url: &str, error: &HttpError) -> anyhow::Result<()> {
        tracing::warn!(url, error = %error, "request attempt failed");
        Ok(())
    }
}

/// Supplies auth headers for requests that do not skip auth.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn auth_headers(&self) -> anyhow::Result<Headers>;
}

/// No auth headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn auth_headers(&self) -> anyhow::Result<Headers> {
        Ok(Headers::new())
    }
}

/// A static bearer token.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for BearerAuth {
    async fn auth_headers(&self) -> anyhow::Result<Headers> {
        if self.token.is_empty() {
            anyhow::bail!("bearer token is empty");
        }
        let mut headers = Headers::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        Ok(headers)
    }
}
