//! Client side of the cache handoff.

use pagewire_cache::CacheSnapshot;
use pagewire_query::QueryCache;
use serde_json::Value;
use tracing::{debug, warn};

use crate::hydration::STATE_GLOBAL;

/// Find the embedded snapshot JSON in a rendered document.
///
/// Only an assignment that opens its own `<script>` counts; the same text in
/// escaped page content is skipped.
pub fn extract_state(html: &str) -> Option<&str> {
    let marker = format!("<script>{STATE_GLOBAL}=");
    let start = html.find(&marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find("</script>")?;
    Some(rest[..end].trim().trim_end_matches(';'))
}

/// Build the client page cache from a rendered document.
///
/// A document without a snapshot, or with one that does not parse, yields an
/// empty cache.
pub fn bootstrap_cache(html: &str) -> QueryCache {
    let cache = QueryCache::new();

    let Some(json) = extract_state(html) else {
        debug!("no embedded state, starting with an empty cache");
        return cache;
    };

    match CacheSnapshot::<Value>::from_json(json) {
        Ok(snapshot) => {
            let restored = cache.restore(snapshot);
            debug!(entries = restored, "restored page cache from document");
        }
        Err(e) => warn!(error = %e, "discarding unreadable embedded state"),
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_state() {
        let html = r#"<body><div>x</div><script>window.__PAGEWIRE_STATE__={"a":1};</script></body>"#;
        assert_eq!(extract_state(html), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_state_text_in_content_is_skipped() {
        let html = concat!(
            "<body><p>try window.__PAGEWIRE_STATE__={&quot;x&quot;:2} in devtools</p>",
            r#"<script>window.__PAGEWIRE_STATE__={"a":1};</script></body>"#,
        );
        assert_eq!(extract_state(html), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_missing_state() {
        assert_eq!(extract_state("<body></body>"), None);
        assert!(bootstrap_cache("<body></body>").is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_state_falls_back_to_empty() {
        let html = "<script>window.__PAGEWIRE_STATE__={not json;</script>";
        assert!(bootstrap_cache(html).is_empty());
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let html = "<script>window.__PAGEWIRE_STATE__={};</script>";
        assert!(bootstrap_cache(html).is_empty());
    }
}
