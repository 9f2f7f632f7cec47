//! Server side of the cache handoff.
//!
//! The server already holds the page data it rendered from. Seeding it into a
//! request-scoped page cache and embedding that cache in the document lets the
//! client start with the data instead of fetching it again.

use std::sync::Arc;

use pagewire_core::PageData;
use pagewire_query::{QueryCache, QueryKind, QueryRegistry};
use tracing::debug;

use crate::error::SsrError;

/// Global the snapshot is assigned to in the document.
pub const STATE_GLOBAL: &str = "window.__PAGEWIRE_STATE__";

/// Seeds request-scoped page caches with server-obtained data.
#[derive(Debug, Clone)]
pub struct HydrationBridge {
    registry: Arc<QueryRegistry>,
}

impl HydrationBridge {
    pub fn new(registry: Arc<QueryRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<QueryRegistry> {
        &self.registry
    }

    /// Create a fresh page cache for `path`, seeded with `page` under the
    /// cache key of the query the path resolves to.
    ///
    /// A path that resolves to nothing, or data that the query would not
    /// produce, leaves the cache empty.
    pub fn seed(&self, path: &str, page: &PageData) -> Result<QueryCache, SsrError> {
        let cache = QueryCache::new();

        let Some(resolved) = self.registry.resolve(path) else {
            debug!(path = %path, "no query for path, nothing to seed");
            return Ok(cache);
        };

        let fits = match (resolved.query.kind(), page) {
            (QueryKind::UserProfile, PageData::UserProfile(_)) => true,
            (_, PageData::Empty) => false,
        };
        if !fits {
            debug!(
                path = %path,
                kind = %resolved.query.kind(),
                page_type = page.page_type(),
                "page data does not match query, nothing to seed"
            );
            return Ok(cache);
        }

        let key = resolved.query.cache_key();
        cache.set(key.clone(), page.to_value()?, resolved.query.stale_time());
        debug!(path = %path, key = %key, "seeded page cache");
        Ok(cache)
    }

    /// Render the whole cache as a script element for the document.
    pub fn snapshot_script(cache: &QueryCache) -> Result<String, SsrError> {
        let json = cache.snapshot().to_script_json()?;
        Ok(format!("<script>{STATE_GLOBAL}={json};</script>"))
    }
}
