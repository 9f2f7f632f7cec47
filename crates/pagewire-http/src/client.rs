//! The retrying, caching HTTP client.

use std::sync::Arc;
use std::time::Duration;

use pagewire_cache::{CacheKey, CacheStatus, DataCache};
use pagewire_core::{Headers, RequestId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::HttpClientConfig;
use crate::error::{AttemptFailure, HttpError};
use crate::hooks::{AuthProvider, NoAuth, RequestHooks};
use crate::request::{build_url, Method, RequestOptions, RequestSpec};
use crate::response::{HttpResponse, ResponseBody};
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

/// Outbound HTTP client.
///
/// Every call goes through [`HttpClient::request`]: URL resolution, the GET
/// response cache, header assembly, then a sequential retry loop where each
/// attempt has its own timeout. The client is shared by `Arc`.
pub struct HttpClient {
    config: HttpClientConfig,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    hooks: Vec<Arc<dyn RequestHooks>>,
    cache: DataCache<ResponseBody>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl HttpClient {
    /// Create a client that talks to the network through `reqwest`.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::InvalidRequest(format!("failed to build client: {}", e)))?;
        Ok(Self::with_transport(
            config,
            Arc::new(ReqwestTransport::with_client(client)),
        ))
    }

    /// Create a client over any transport.
    pub fn with_transport(config: HttpClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            auth: Arc::new(NoAuth),
            hooks: Vec::new(),
            cache: DataCache::new(),
        }
    }

    /// Set the auth provider.
    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// Add instrumentation hooks. Hooks run in the order they were added.
    pub fn with_hooks(mut self, hooks: Arc<dyn RequestHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// The response cache, keyed by final URL.
    pub fn cache(&self) -> &DataCache<ResponseBody> {
        &self.cache
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Drop cached responses whose URL matches `pattern`.
    pub fn invalidate_cache(&self, pattern: &str) -> Result<usize, HttpError> {
        let regex = regex::Regex::new(pattern)
            .map_err(|e| HttpError::InvalidRequest(format!("invalid cache pattern: {}", e)))?;
        Ok(self
            .cache
            .invalidate_where(|key| key.parts().iter().any(|part| regex.is_match(part))))
    }

    /// Execute a request and return the classified outcome.
    pub async fn request(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let started = Instant::now();
        let request_id = RequestId::generate();
        let url = self.resolve_url(url, &options.query)?;

        let cache_ttl = match options.method {
            Method::Get => options.cache.ttl(self.config.default_cache_ttl()),
            _ => None,
        };
        let cache_key = CacheKey::single(url.clone());

        if cache_ttl.is_some() {
            if let Some(data) = self.cache.get(&cache_key) {
                debug!(request_id = %request_id, url = %url, cache = %CacheStatus::Hit, "serving cached response");
                return Ok(HttpResponse {
                    data,
                    status: 200,
                    status_text: "OK".to_string(),
                    headers: Headers::new(),
                    request_id,
                    duration: started.elapsed(),
                    cache: CacheStatus::Hit,
                });
            }
            debug!(request_id = %request_id, url = %url, cache = %CacheStatus::Miss, "response cache miss");
        }

        let headers = self.build_headers(&request_id, &options).await?;
        let body = match (&options.method, &options.body) {
            (Method::Get, _) | (_, None) => None,
            (_, Some(body)) => Some(serde_json::to_vec(body).map_err(|e| {
                HttpError::InvalidRequest(format!("body serialization: {}", e))
            })?),
        };
        let request = TransportRequest {
            method: options.method,
            url: url.clone(),
            headers,
            body,
        };

        let policy = self.config.retry_policy(options.retries);
        let timeout = options.timeout.unwrap_or_else(|| self.config.timeout());
        let mut retries_done = 0u32;

        loop {
            let attempt = retries_done + 1;
            self.notify_request(&request).await;

            let attempt_started = Instant::now();
            let outcome = tokio::time::timeout(timeout, self.transport.send(request.clone())).await;

            let failure = match outcome {
                Err(_) => AttemptFailure::Timeout(timeout),
                Ok(Err(e)) => AttemptFailure::Network(e.to_string()),
                Ok(Ok(response)) => {
                    self.notify_response(&response, attempt_started.elapsed())
                        .await;

                    if response.is_success() {
                        let data = match ResponseBody::parse(response.content_type(), &response.body) {
                            Ok(data) => data,
                            Err(e) => {
                                let err = HttpError::Decode {
                                    message: e.to_string(),
                                    url: url.clone(),
                                    request_id: request_id.clone(),
                                };
                                self.notify_error(&url, &err).await;
                                return Err(err);
                            }
                        };

                        let cache = match cache_ttl {
                            Some(ttl) => {
                                self.cache.set(cache_key, data.clone(), ttl);
                                CacheStatus::Miss
                            }
                            None => CacheStatus::Bypass,
                        };

                        let duration = started.elapsed();
                        debug!(
                            request_id = %request_id,
                            url = %url,
                            status = response.status,
                            attempt,
                            duration_ms = duration.as_millis() as u64,
                            "request succeeded"
                        );
                        return Ok(HttpResponse {
                            data,
                            status: response.status,
                            status_text: response.status_text,
                            headers: response.headers,
                            request_id,
                            duration,
                            cache,
                        });
                    }

                    let body = ResponseBody::parse_lossy(&response.body);
                    let message = body.error_message(response.status);

                    if response.status < 500 {
                        let err = HttpError::Client {
                            status: response.status,
                            status_text: response.status_text,
                            message,
                            body,
                            url: url.clone(),
                            request_id: request_id.clone(),
                        };
                        warn!(request_id = %request_id, url = %url, status = err.status().unwrap_or_default(), "request rejected");
                        self.notify_error(&url, &err).await;
                        return Err(err);
                    }

                    AttemptFailure::Status {
                        status: response.status,
                        status_text: response.status_text,
                        message,
                        body,
                    }
                }
            };

            let retry = policy.should_retry(&failure, retries_done);
            let err = HttpError::Server {
                last: failure,
                attempts: attempt,
                url: url.clone(),
                request_id: request_id.clone(),
            };
            self.notify_error(&url, &err).await;

            if retry {
                let delay = policy.delay_before_retry(retries_done);
                warn!(
                    request_id = %request_id,
                    url = %url,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
                retries_done += 1;
                continue;
            }

            error!(
                request_id = %request_id,
                url = %url,
                attempts = attempt,
                duration_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "request failed"
            );
            return Err(err);
        }
    }

    /// Execute a prepared request.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<HttpResponse, HttpError> {
        self.request(&spec.url, spec.options.clone()).await
    }

    /// GET and decode the body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request_as(url, options.method(Method::Get)).await
    }

    /// POST a JSON body and decode the response.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request_as(url, options.method(Method::Post).json(body)?)
            .await
    }

    /// PUT a JSON body and decode the response.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request_as(url, options.method(Method::Put).json(body)?)
            .await
    }

    /// PATCH a JSON body and decode the response.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request_as(url, options.method(Method::Patch).json(body)?)
            .await
    }

    /// DELETE and decode the response.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        self.request_as(url, options.method(Method::Delete)).await
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let response = self.request(url, options).await?;
        let request_id = response.request_id;
        response.data.decode().map_err(|e| HttpError::Decode {
            message: e.to_string(),
            url: url.to_string(),
            request_id,
        })
    }

    fn resolve_url(&self, url: &str, query: &[(String, String)]) -> Result<String, HttpError> {
        let absolute = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            let base = self.config.base_url.as_deref().ok_or_else(|| {
                HttpError::InvalidRequest(format!("relative URL {} without a base URL", url))
            })?;
            format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        };

        url::Url::parse(&absolute)
            .map_err(|e| HttpError::InvalidRequest(format!("invalid URL {}: {}", absolute, e)))?;

        Ok(build_url(&absolute, query))
    }

    async fn build_headers(
        &self,
        request_id: &RequestId,
        options: &RequestOptions,
    ) -> Result<Headers, HttpError> {
        let mut headers = Headers::new();
        set_header(&mut headers, "Content-Type", "application/json");
        set_header(&mut headers, "X-Request-ID", request_id.as_str());
        for (key, value) in &self.config.default_headers {
            set_header(&mut headers, key, value);
        }
        for (key, value) in &options.headers {
            set_header(&mut headers, key, value);
        }

        if !options.skip_auth {
            let auth = self.auth.auth_headers().await.map_err(|e| {
                HttpError::InvalidRequest(format!("auth provider failed: {:#}", e))
            })?;
            for (key, value) in &auth {
                set_header(&mut headers, key, value);
            }
        }

        Ok(headers)
    }

    async fn notify_request(&self, request: &TransportRequest) {
        for hooks in &self.hooks {
            if let Err(e) = hooks.on_request(request).await {
                warn!(error = %e, "on_request hook failed");
            }
        }
    }

    async fn notify_response(&self, response: &TransportResponse, elapsed: Duration) {
        for hooks in &self.hooks {
            if let Err(e) = hooks.on_response(response, elapsed).await {
                warn!(error = %e, "on_response hook failed");
            }
        }
    }

    async fn notify_error(&self, url: &str, err: &HttpError) {
        for hooks in &self.hooks {
            if let Err(e) = hooks.on_error(url, err).await {
                warn!(error = %e, "on_error hook failed");
            }
        }
    }
}

/// Insert a header, replacing any existing header with the same name in any case.
fn set_header(headers: &mut Headers, key: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
    headers.insert(key.to_string(), value.to_string());
}
