//! Development-time extension points.

use axum::Router;

/// Hooks a development server can use to wrap the app.
///
/// Both methods default to leaving their input untouched.
pub trait DevHook: Send + Sync {
    /// Wrap or extend the router before it is served.
    fn layer(&self, router: Router) -> Router {
        router
    }

    /// Rewrite a rendered document before it is sent.
    fn transform_html(&self, _path: &str, html: String) -> String {
        html
    }
}

/// Injects a script before `</body>` of every document, e.g. a live-reload
/// client.
#[derive(Debug, Clone)]
pub struct ScriptInjector {
    src: String,
}

impl ScriptInjector {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }
}

impl DevHook for ScriptInjector {
    fn transform_html(&self, _path: &str, html: String) -> String {
        let tag = format!(r#"<script type="module" src="{}"></script>"#, self.src);
        match html.rfind("</body>") {
            Some(at) => {
                let mut html = html;
                html.insert_str(at, &tag);
                html
            }
            None => html + &tag,
        }
    }
}
