//! Request options and specs.

use std::time::Duration;

use pagewire_core::Headers;
use serde::Serialize;

use crate::error::HttpError;

/// HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response caching requested for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Do not read or write the response cache.
    #[default]
    Disabled,
    /// Cache with the client's default TTL.
    DefaultTtl,
    /// Cache with an explicit TTL.
    Ttl(Duration),
}

impl CacheMode {
    /// Resolve the TTL to use, if caching is requested. A zero TTL disables
    /// caching.
    pub fn ttl(&self, default: Duration) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::DefaultTtl => Some(default),
            Self::Ttl(ttl) if ttl.is_zero() => None,
            Self::Ttl(ttl) => Some(*ttl),
        }
    }

    /// Cache for a number of seconds.
    pub fn secs(secs: u64) -> Self {
        Self::Ttl(Duration::from_secs(secs))
    }
}

impl From<bool> for CacheMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::DefaultTtl
        } else {
            Self::Disabled
        }
    }
}

impl From<Duration> for CacheMode {
    fn from(ttl: Duration) -> Self {
        Self::Ttl(ttl)
    }
}

/// Per-call options. Unset fields fall back to the client's configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// JSON body (ignored for GET).
    pub body: Option<serde_json::Value>,
    /// Per-call headers, applied after the client's default headers.
    pub headers: Headers,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    /// Additional attempts after the first.
    pub retries: Option<u32>,
    /// Skip the auth provider.
    pub skip_auth: bool,
    /// Response caching (GET only).
    pub cache: CacheMode,
    /// Query parameters appended to the URL, in order.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    /// Create default options (GET, no cache).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        let value = serde_json::to_value(body)
            .map_err(|e| HttpError::InvalidRequest(format!("body serialization: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set a JSON body from a value.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Do not add auth headers.
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Request response caching (`true`, or an explicit TTL).
    pub fn cache(mut self, cache: impl Into<CacheMode>) -> Self {
        self.cache = cache.into();
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// A complete request: URL plus options.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Absolute URL, or a path relative to the client's base URL.
    pub url: String,
    /// Request options.
    pub options: RequestOptions,
}

impl RequestSpec {
    /// Create a spec.
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    /// Create a GET spec with default options.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, RequestOptions::new())
    }

    /// The method of this request.
    pub fn method(&self) -> Method {
        self.options.method
    }

    /// The explicit cache TTL, if one was requested.
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.options.cache {
            CacheMode::Ttl(ttl) => Some(ttl),
            _ => None,
        }
    }
}

/// Append form-encoded query parameters to a URL.
pub fn build_url(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, encoded)
}
