//! Page-data fetching through the HTTP client into the page cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use pagewire_cache::{CacheKey, DataCache};
use pagewire_core::PageData;
use pagewire_http::{HttpClient, HttpError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::query::PageQuery;

/// Page-data cache shared by the renderer, the navigator and prefetching.
pub type QueryCache = DataCache<Value>;

type InFlight = Shared<BoxFuture<'static, Result<Value, HttpError>>>;

/// Fetches page queries and stores their results in a [`QueryCache`].
///
/// Concurrent fetches of the same key share one request.
pub struct QueryClient {
    http: Arc<HttpClient>,
    cache: Arc<QueryCache>,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new(http: Arc<HttpClient>, cache: Arc<QueryCache>) -> Self {
        Self {
            http,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    /// Live cached data for a query, without fetching.
    pub fn get_cached(&self, query: &PageQuery) -> Option<Value> {
        self.cache.get(&query.cache_key())
    }

    /// Live cached data for a query, decoded as a page.
    pub fn get_page(&self, query: &PageQuery) -> Option<PageData> {
        self.get_cached(query)
            .and_then(|value| PageData::from_value(value).ok())
    }

    /// Fetch a query's data and store it under the query's cache key.
    ///
    /// Always goes to the network unless a fetch of the same key is already
    /// running, in which case its result is shared.
    pub async fn fetch(&self, query: &PageQuery) -> Result<Value, HttpError> {
        let key = query.cache_key();
        let fetch = self.join_or_start(&key, query);
        let result = fetch.clone().await;

        let mut in_flight = self.lock_in_flight();
        if in_flight.get(&key).is_some_and(|f| f.ptr_eq(&fetch)) {
            in_flight.remove(&key);
        }
        result
    }

    /// Fetch unless fresh data is cached. Failures are logged, not returned.
    pub async fn prefetch(&self, query: &PageQuery) {
        if self.get_cached(query).is_some() {
            debug!(key = %query.cache_key(), "prefetch skipped, already cached");
            return;
        }
        if let Err(e) = self.fetch(query).await {
            warn!(key = %query.cache_key(), error = %e, "prefetch failed");
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_or_start(&self, key: &CacheKey, query: &PageQuery) -> InFlight {
        let mut in_flight = self.lock_in_flight();
        if let Some(existing) = in_flight.get(key) {
            // A finished future left behind by a dropped caller is not reused.
            if existing.peek().is_none() {
                debug!(key = %key, "joining in-flight fetch");
                return existing.clone();
            }
        }

        let http = Arc::clone(&self.http);
        let cache = Arc::clone(&self.cache);
        let spec = query.request_spec();
        let ttl = query.stale_time();
        let cache_key = key.clone();

        let fetch = async move {
            let response = http.execute(&spec).await?;
            let value = response.data.into_value();
            debug!(key = %cache_key, request_id = %response.request_id, "page data cached");
            cache.set(cache_key, value.clone(), ttl);
            Ok(value)
        }
        .boxed()
        .shared();

        in_flight.insert(key.clone(), fetch.clone());
        fetch
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::registry::QueryRegistry;
    use pagewire_http::{HttpClientConfig, MockResponse, MockTransport};
    use serde_json::json;

    fn query_client(mock: &Arc<MockTransport>) -> QueryClient {
        let http = HttpClient::with_transport(
            HttpClientConfig::default()
                .with_base_url("http://app.test")
                .with_retries(0),
            mock.clone(),
        );
        QueryClient::new(Arc::new(http), Arc::new(QueryCache::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_and_fetch_populates_cache() {
        let mock = Arc::new(MockTransport::new().respond_with(
            "/api/users/7",
            MockResponse::json(200, &json!({"id": 7, "firstName": "Ada"})),
        ));
        let client = query_client(&mock);

        let resolved = QueryRegistry::with_defaults().resolve("/users/7").unwrap();
        assert_eq!(resolved.params.get("id").map(String::as_str), Some("7"));
        assert_eq!(resolved.query.cache_key().serialized(), r#"["user","7"]"#);

        client.fetch(&resolved.query).await.unwrap();

        assert_eq!(
            client.cache().get(&CacheKey::new(["user", "7"])),
            Some(json!({"id": 7, "firstName": "Ada"}))
        );
        assert_eq!(mock.calls()[0].url, "http://app.test/api/users/7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_leaves_cache_empty() {
        let mock = Arc::new(MockTransport::new());
        let client = query_client(&mock);
        let query = PageQuery::UserProfile { id: "9".to_string() };

        let err = client.fetch(&query).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(client.get_cached(&query).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_request() {
        let mock = Arc::new(MockTransport::new().respond_with(
            "/api/users/1",
            MockResponse::json(200, &json!({"$type": "UserProfilePage", "id": 1}))
                .with_delay(Duration::from_millis(300)),
        ));
        let client = query_client(&mock);
        let query = PageQuery::UserProfile { id: "1".to_string() };

        let (a, b) = tokio::join!(client.fetch(&query), client.fetch(&query));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(mock.call_count(), 1);

        client.fetch(&query).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefetch_skips_cached_and_swallows_errors() {
        let mock = Arc::new(MockTransport::new());
        let client = query_client(&mock);
        let query = PageQuery::UserProfile { id: "2".to_string() };

        client.prefetch(&query).await;
        assert_eq!(mock.call_count(), 1);

        client
            .cache()
            .set(query.cache_key(), json!({"id": 2}), Duration::from_secs(60));
        client.prefetch(&query).await;
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_data_expires_after_stale_time() {
        let mock = Arc::new(MockTransport::new().respond_with(
            "/api/users/3",
            MockResponse::json(200, &json!({"$type": "UserProfilePage", "id": 3, "firstName": "Lin"})),
        ));
        let client = query_client(&mock);
        let query = PageQuery::UserProfile { id: "3".to_string() };

        client.fetch(&query).await.unwrap();
        let page = client.get_page(&query).unwrap();
        assert_eq!(page.as_user_profile().map(|u| u.first_name.as_str()), Some("Lin"));

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
        assert!(client.get_cached(&query).is_none());
    }
}
