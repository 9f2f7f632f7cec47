//! In-memory scripted transport for development and testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use pagewire_core::Headers;
use serde_json::Value;
use tokio::time::Instant;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// A scripted answer, optionally delayed.
#[derive(Debug, Clone)]
pub struct MockResponse {
    outcome: Result<TransportResponse, TransportError>,
    delay: Duration,
}

impl MockResponse {
    /// A JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self::from_parts(status, headers, body.to_string().into_bytes())
    }

    /// A plain-text response with the given status.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self::from_parts(status, headers, body.into().into_bytes())
    }

    /// A connection failure.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(TransportError::Connection(message.into())),
            delay: Duration::ZERO,
        }
    }

    fn from_parts(status: u16, headers: Headers, body: Vec<u8>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            outcome: Ok(TransportResponse {
                status,
                status_text,
                headers,
                body,
            }),
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(response) = &mut self.outcome {
            response.headers.insert(key.into(), value.into());
        }
        self
    }
}

/// A [`Transport`] that answers from a script and records every call.
///
/// One-shot responses queued with [`MockTransport::enqueue`] are used first, in
/// order. Otherwise the first route whose pattern is a substring of the URL
/// answers. Unmatched requests get a 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, MockResponse)>>,
    queue: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<(Instant, TransportRequest)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request whose URL contains `pattern`.
    pub fn respond_with(self, pattern: impl Into<String>, response: MockResponse) -> Self {
        lock(&self.routes).push((pattern.into(), response));
        self
    }

    /// Answer the next unanswered request, regardless of URL.
    pub fn enqueue(&self, response: MockResponse) {
        lock(&self.queue).push_back(response);
    }

    /// Number of requests received.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests received, in order.
    pub fn calls(&self) -> Vec<TransportRequest> {
        lock(&self.calls).iter().map(|(_, r)| r.clone()).collect()
    }

    /// When each request was received.
    pub fn call_instants(&self) -> Vec<Instant> {
        lock(&self.calls).iter().map(|(at, _)| *at).collect()
    }

    fn pick(&self, url: &str) -> MockResponse {
        if let Some(response) = lock(&self.queue).pop_front() {
            return response;
        }
        lock(&self.routes)
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| MockResponse::json(404, &serde_json::json!({"message": "Not Found"})))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = self.pick(&request.url);
        lock(&self.calls).push((Instant::now(), request));

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.outcome
    }
}
