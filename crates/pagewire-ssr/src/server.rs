//! Listener setup.

use std::sync::Arc;

use tracing::info;

use crate::app::{build_app, AppState};
use crate::config::AppConfig;
use crate::dev::DevHook;
use crate::error::SsrError;

/// Bind `config.server.bind` and serve the app until the listener fails.
pub async fn serve(config: &AppConfig, dev_hook: Option<Arc<dyn DevHook>>) -> Result<(), SsrError> {
    let state = AppState::from_config(config)?;
    let app = build_app(state, dev_hook);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        upstream = %config.upstream.base_url,
        dev = config.server.dev,
        "pagewire server starting"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
