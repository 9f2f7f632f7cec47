//! Document rendering.

use std::sync::Arc;

use pagewire_core::{PageData, UserProfile};
use pagewire_query::{QueryCache, QueryRegistry};

use crate::error::SsrError;

/// Renders the body markup for a path from the seeded page cache.
pub trait Renderer: Send + Sync {
    fn render(&self, path: &str, cache: &QueryCache) -> Result<String, SsrError>;
}

/// Default renderer: a profile card for user pages, a link list otherwise.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    registry: Arc<QueryRegistry>,
}

impl DocumentRenderer {
    pub fn new(registry: Arc<QueryRegistry>) -> Self {
        Self { registry }
    }

    fn render_profile(user: &UserProfile) -> String {
        let image = if user.image.is_empty() {
            String::new()
        } else {
            format!(
                r#"<img src="{}" alt="{}">"#,
                html_escape(&user.image),
                html_escape(&user.display_name())
            )
        };
        format!(
            r#"<main data-page="UserProfilePage"><article class="profile">{image}<h1>{}</h1><p>@{}</p><p>{}</p></article><nav><a href="/">Home</a></nav></main>"#,
            html_escape(&user.display_name()),
            html_escape(&user.username),
            html_escape(&user.email),
        )
    }

    fn render_home() -> String {
        let links: String = (1..=5)
            .map(|id| format!(r#"<li><a href="/users/{id}">User {id}</a></li>"#))
            .collect();
        format!(r#"<main data-page="EmptyPage"><h1>Users</h1><ul>{links}</ul></main>"#)
    }
}

impl Renderer for DocumentRenderer {
    fn render(&self, path: &str, cache: &QueryCache) -> Result<String, SsrError> {
        let page = self
            .registry
            .resolve(path)
            .and_then(|resolved| cache.get(&resolved.query.cache_key()))
            .map(PageData::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(match page {
            PageData::UserProfile(user) => Self::render_profile(&user),
            PageData::Empty => Self::render_home(),
        })
    }
}

/// Wrap body markup in the HTML document.
pub fn generate_shell_html(
    app_name: &str,
    css_path: Option<&str>,
    script_path: Option<&str>,
    body_html: &str,
    state_script: &str,
) -> String {
    let css_link = css_path
        .map(|p| format!(r#"<link rel="stylesheet" href="{}">"#, html_escape(p)))
        .unwrap_or_default();
    let app_script = script_path
        .map(|p| format!(r#"<script type="module" src="{}"></script>"#, html_escape(p)))
        .unwrap_or_default();
    let app_name = html_escape(app_name);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    {css_link}
    <title>{app_name}</title>
</head>
<body>
    <div id="app">{body_html}</div>
    {state_script}
    {app_script}
</body>
</html>"#
    )
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_cache::cache_key;
    use serde_json::json;
    use std::time::Duration;

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::new(Arc::new(QueryRegistry::with_defaults()))
    }

    #[tokio::test]
    async fn test_renders_profile_from_cache() {
        let cache = QueryCache::new();
        cache.set(
            cache_key!("user", "7"),
            json!({"$type": "UserProfilePage", "id": 7, "firstName": "Ada", "lastName": "<Lovelace>", "username": "ada"}),
            Duration::from_secs(60),
        );

        let html = renderer().render("/users/7", &cache).unwrap();
        assert!(html.contains(r#"data-page="UserProfilePage""#));
        assert!(html.contains("<h1>Ada &lt;Lovelace&gt;</h1>"));
        assert!(html.contains("@ada"));
    }

    #[tokio::test]
    async fn test_uncached_path_renders_home() {
        let html = renderer().render("/users/7", &QueryCache::new()).unwrap();
        assert!(html.contains(r#"data-page="EmptyPage""#));
        assert!(html.contains(r#"href="/users/1""#));
    }

    #[tokio::test]
    async fn test_malformed_cached_page_is_error() {
        let cache = QueryCache::new();
        cache.set(cache_key!("user", "7"), json!({"id": 7}), Duration::from_secs(60));
        assert!(matches!(
            renderer().render("/users/7", &cache),
            Err(SsrError::Data(_))
        ));
    }

    #[test]
    fn test_shell_html() {
        let html = generate_shell_html(
            "Demo & Co",
            Some("/style.css"),
            Some("/app.js"),
            "<p>hi</p>",
            "<script>state</script>",
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Demo &amp; Co</title>"));
        assert!(html.contains(r#"<link rel="stylesheet" href="/style.css">"#));
        assert!(html.contains(r#"<div id="app"><p>hi</p></div>"#));
        assert!(html.contains("<script>state</script>"));
        assert!(html.contains(r#"src="/app.js""#));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
