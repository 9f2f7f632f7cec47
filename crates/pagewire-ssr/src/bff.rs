//! Backend-for-frontend: the server-side source of page data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagewire_core::{PageData, UserProfile};
use pagewire_http::{HttpClient, RequestOptions};
use tracing::debug;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::SsrError;

/// Produces the data for a page given its resource id.
#[async_trait]
pub trait BackendForFrontend: Send + Sync {
    async fn fetch_page_data(&self, resource_id: &str) -> Result<PageData, SsrError>;
}

/// Loads user profiles from the upstream user service.
#[derive(Debug, Clone)]
pub struct UserProfileBff {
    http: Arc<HttpClient>,
    base_url: String,
    delay: Duration,
}

impl UserProfileBff {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(http: Arc<HttpClient>, upstream: &UpstreamConfig) -> Self {
        Self::new(http, &upstream.base_url).with_delay(upstream.delay())
    }

    /// Sleep this long before every upstream call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream URL for a user, with the id encoded as one path segment.
    fn user_url(&self, resource_id: &str) -> Result<Url, SsrError> {
        if matches!(resource_id, "" | "." | "..") {
            return Err(SsrError::InvalidResource(resource_id.to_string()));
        }
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("users")
            .push(resource_id);
        Ok(url)
    }
}

#[async_trait]
impl BackendForFrontend for UserProfileBff {
    async fn fetch_page_data(&self, resource_id: &str) -> Result<PageData, SsrError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let url = self.user_url(resource_id)?;
        debug!(url = %url, "loading user profile");
        let user: UserProfile = self.http.get(url.as_str(), RequestOptions::default()).await?;
        Ok(PageData::UserProfile(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_http::{HttpClientConfig, HttpError, MockResponse, MockTransport};
    use serde_json::json;

    fn bff(transport: MockTransport) -> (UserProfileBff, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let http = HttpClient::with_transport(
            HttpClientConfig::default().with_retries(0),
            transport.clone(),
        );
        (UserProfileBff::new(Arc::new(http), "https://users.test/"), transport)
    }

    #[tokio::test]
    async fn test_fetches_user_profile() {
        let (bff, transport) = bff(MockTransport::new().respond_with(
            "/users/7",
            MockResponse::json(200, &json!({"id": 7, "firstName": "Ada", "lastName": "Lovelace"})),
        ));

        let page = bff.fetch_page_data("7").await.unwrap();
        let user = page.as_user_profile().unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert_eq!(transport.calls()[0].url, "https://users.test/users/7");
    }

    #[tokio::test]
    async fn test_upstream_404_is_client_error() {
        let (bff, _) = bff(MockTransport::new());
        let err = bff.fetch_page_data("0").await.unwrap_err();
        assert!(matches!(err, SsrError::Upstream(HttpError::Client { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_resource_id_stays_in_one_segment() {
        let (bff, transport) = bff(MockTransport::new());

        let err = bff.fetch_page_data("7/../../admin?x=1#top").await.unwrap_err();

        assert!(matches!(err, SsrError::Upstream(HttpError::Client { status: 404, .. })));
        assert_eq!(
            transport.calls()[0].url,
            "https://users.test/users/7%2F..%2F..%2Fadmin%3Fx=1%23top"
        );
    }

    #[tokio::test]
    async fn test_dot_segments_rejected() {
        let (bff, transport) = bff(MockTransport::new());

        for id in ["", ".", ".."] {
            let err = bff.fetch_page_data(id).await.unwrap_err();
            assert!(matches!(err, SsrError::InvalidResource(_)));
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_base_url_path_is_kept() {
        let transport = Arc::new(MockTransport::new());
        let http = HttpClient::with_transport(
            HttpClientConfig::default().with_retries(0),
            transport.clone(),
        );
        let bff = UserProfileBff::new(Arc::new(http), "https://gateway.test/v2");

        let _ = bff.fetch_page_data("9").await;

        assert_eq!(transport.calls()[0].url, "https://gateway.test/v2/users/9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_artificial_delay() {
        let (bff, _) = bff(MockTransport::new().respond_with(
            "/users/1",
            MockResponse::json(200, &json!({"id": 1})),
        ));
        let bff = bff.with_delay(Duration::from_millis(700));

        let start = tokio::time::Instant::now();
        bff.fetch_page_data("1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(700));
    }
}
