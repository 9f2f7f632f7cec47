//! The axum application.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Uri,
    response::Html,
    routing::get,
    Json, Router,
};
use pagewire_core::PageData;
use pagewire_http::HttpClient;
use pagewire_query::QueryRegistry;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bff::{BackendForFrontend, UserProfileBff};
use crate::config::{AppConfig, ServerConfig};
use crate::dev::DevHook;
use crate::error::SsrError;
use crate::hydration::HydrationBridge;
use crate::render::{generate_shell_html, DocumentRenderer, Renderer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bff: Arc<dyn BackendForFrontend>,
    pub bridge: HydrationBridge,
    pub renderer: Arc<dyn Renderer>,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(
        bff: Arc<dyn BackendForFrontend>,
        registry: Arc<QueryRegistry>,
        server: ServerConfig,
    ) -> Self {
        Self {
            bff,
            bridge: HydrationBridge::new(Arc::clone(&registry)),
            renderer: Arc::new(DocumentRenderer::new(registry)),
            server,
        }
    }

    /// Wire the default services from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SsrError> {
        let http = Arc::new(HttpClient::new(config.http.clone())?);
        let bff = UserProfileBff::from_config(http, &config.upstream);
        Ok(Self::new(
            Arc::new(bff),
            Arc::new(QueryRegistry::with_defaults()),
            config.server.clone(),
        ))
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

#[derive(Clone)]
struct AppContext {
    state: AppState,
    dev_hook: Option<Arc<dyn DevHook>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the router: the page-data API, the rendered pages and a health check.
pub fn build_app(state: AppState, dev_hook: Option<Arc<dyn DevHook>>) -> Router {
    let context = Arc::new(AppContext {
        state,
        dev_hook: dev_hook.clone(),
    });

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/users/:id", get(user_api_handler))
        .route("/users/:id", get(user_page_handler))
        .route("/", get(home_handler))
        .with_state(context)
        .layer(TraceLayer::new_for_http());

    match dev_hook {
        Some(hook) => hook.layer(router),
        None => router,
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn user_api_handler(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<PageData>, SsrError> {
    let page = context.state.bff.fetch_page_data(&id).await?;
    Ok(Json(page))
}

async fn user_page_handler(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<String>,
    uri: Uri,
) -> Result<Html<String>, SsrError> {
    let page = context.state.bff.fetch_page_data(&id).await?;
    render_document(&context, uri.path(), &page).map(Html)
}

async fn home_handler(
    State(context): State<Arc<AppContext>>,
    uri: Uri,
) -> Result<Html<String>, SsrError> {
    render_document(&context, uri.path(), &PageData::Empty).map(Html)
}

fn render_document(context: &AppContext, path: &str, page: &PageData) -> Result<String, SsrError> {
    let state = &context.state;
    let cache = state.bridge.seed(path, page)?;
    let body = state.renderer.render(path, &cache)?;
    let state_script = HydrationBridge::snapshot_script(&cache)?;

    let html = generate_shell_html(
        &state.server.app_name,
        state.server.css_path.as_deref(),
        state.server.script_path.as_deref(),
        &body,
        &state_script,
    );
    info!(path = %path, page_type = page.page_type(), seeded = cache.len(), "rendered document");

    Ok(match &context.dev_hook {
        Some(hook) => hook.transform_html(path, html),
        None => html,
    })
}
