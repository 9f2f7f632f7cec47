//! Page queries: how a page's data is fetched and cached.

use std::time::Duration;

use pagewire_cache::{cache_key, CacheKey};
use pagewire_core::RouteParams;
use pagewire_http::RequestSpec;

use crate::error::RouteError;
use crate::pattern::RoutePattern;

/// How long fetched page data stays fresh.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// The kinds of page data the app knows how to fetch.
///
/// Each kind carries its page pattern, its data endpoint and its cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// A user profile page.
    UserProfile,
}

impl QueryKind {
    /// Every kind, in registration order.
    pub const ALL: [QueryKind; 1] = [QueryKind::UserProfile];

    /// Page route this kind is registered under by default.
    pub fn default_pattern(&self) -> &'static str {
        match self {
            Self::UserProfile => "/users/:id",
        }
    }

    /// Route params the kind needs to build its query.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::UserProfile => &["id"],
        }
    }

    /// How long fetched data stays fresh in the page cache.
    pub fn stale_time(&self) -> Duration {
        match self {
            Self::UserProfile => DEFAULT_STALE_TIME,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UserProfile => "user",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete page query: a kind plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageQuery {
    UserProfile { id: String },
}

impl PageQuery {
    /// Build a query of `kind` from matched route params.
    pub fn from_params(
        kind: QueryKind,
        pattern: &str,
        params: &RouteParams,
    ) -> Result<Self, RouteError> {
        let param = |name: &str| {
            params.get(name).cloned().ok_or_else(|| RouteError::MissingParam {
                pattern: pattern.to_string(),
                name: name.to_string(),
            })
        };

        match kind {
            QueryKind::UserProfile => Ok(Self::UserProfile { id: param("id")? }),
        }
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Self::UserProfile { .. } => QueryKind::UserProfile,
        }
    }

    /// Key the query's data is stored under in the page cache.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            Self::UserProfile { id } => cache_key!("user", id),
        }
    }

    /// Path of the JSON endpoint serving this query's data.
    pub fn api_path(&self) -> String {
        match self {
            Self::UserProfile { id } => format!("/api/users/{}", id),
        }
    }

    /// The request that fetches this query's data.
    pub fn request_spec(&self) -> RequestSpec {
        RequestSpec::get(self.api_path())
    }

    pub fn stale_time(&self) -> Duration {
        self.kind().stale_time()
    }
}

/// A registered pattern and the query kind it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDescriptor {
    pub pattern: RoutePattern,
    pub kind: QueryKind,
}

impl FetchDescriptor {
    /// Create a descriptor, checking that the pattern binds every param the kind needs.
    pub fn new(pattern: RoutePattern, kind: QueryKind) -> Result<Self, RouteError> {
        for required in kind.required_params() {
            if !pattern.param_names().any(|name| name == *required) {
                return Err(RouteError::MissingParam {
                    pattern: pattern.as_str().to_string(),
                    name: (*required).to_string(),
                });
            }
        }
        Ok(Self { pattern, kind })
    }

    pub fn query(&self, params: &RouteParams) -> Result<PageQuery, RouteError> {
        PageQuery::from_params(self.kind, self.pattern.as_str(), params)
    }

    pub fn build_request(&self, params: &RouteParams) -> Result<RequestSpec, RouteError> {
        self.query(params).map(|q| q.request_spec())
    }

    pub fn cache_key(&self, params: &RouteParams) -> Result<CacheKey, RouteError> {
        self.query(params).map(|q| q.cache_key())
    }
}
