//! Outbound HTTP client with retry, timeouts and TTL response caching.
//!
//! This crate provides:
//! - `HttpClient` - `get`/`post`/`put`/`patch`/`delete` over a single retrying `request`
//! - `RequestOptions` / `RequestSpec` - Per-call method, headers, body, timeout, retries, cache
//! - `RetryPolicy` - Which failures are retried and how long to wait
//! - `Transport` - The network seam (`ReqwestTransport`, `MockTransport`)
//! - `RequestHooks` / `AuthProvider` - Instrumentation and auth extension points
//!
//! # Example
//!
//! ```rust,ignore
//! use pagewire_http::{HttpClient, HttpClientConfig, RequestOptions};
//!
//! let client = HttpClient::new(HttpClientConfig::default())?;
//!
//! // Cached for the default TTL; a second call within it skips the network.
//! let user: serde_json::Value = client
//!     .get("https://dummyjson.com/users/1", RequestOptions::new().cache(true))
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod hooks;
mod mock;
mod request;
mod response;
mod retry;
mod transport;

pub use client::*;
pub use config::*;
pub use error::*;
pub use hooks::*;
pub use mock::*;
pub use request::*;
pub use response::*;
pub use retry::*;
pub use transport::*;
