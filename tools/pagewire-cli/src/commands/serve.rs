//! Serve command.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use pagewire_observability::{init_logging, LogFormat};
use pagewire_ssr::{AppConfig, DevHook, ScriptInjector};

use super::ServeArgs;
use crate::context::Context;

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = apply_args(ctx.config.clone(), &args);

    init_logging(&config.logging).context("Failed to initialize logging")?;

    let dev_hook = args
        .dev_script
        .map(|src| Arc::new(ScriptInjector::new(src)) as Arc<dyn DevHook>);

    ctx.output.info(&format!(
        "Serving on http://{} (upstream {})",
        config.server.bind, config.upstream.base_url
    ));

    pagewire_ssr::serve(&config, dev_hook)
        .await
        .with_context(|| format!("Server on {} failed", config.server.bind))
}

fn apply_args(mut config: AppConfig, args: &ServeArgs) -> AppConfig {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(upstream) = &args.upstream {
        config.upstream.base_url = upstream.clone();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.upstream.delay_ms = delay_ms;
    }
    if args.dev {
        config.server.dev = true;
    }
    match args.log_format {
        Some(format) => config.logging.format = format,
        None if config.server.dev => config.logging.format = LogFormat::Human,
        None => {}
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            bind: None,
            upstream: None,
            delay_ms: None,
            dev: false,
            dev_script: None,
            log_format: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = apply_args(
            AppConfig::default(),
            &ServeArgs {
                bind: Some("0.0.0.0:8080".to_string()),
                upstream: Some("http://localhost:9000".to_string()),
                delay_ms: Some(700),
                ..args()
            },
        );
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.upstream.base_url, "http://localhost:9000");
        assert_eq!(config.upstream.delay_ms, 700);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_dev_defaults_to_human_logs() {
        let config = apply_args(AppConfig::default(), &ServeArgs { dev: true, ..args() });
        assert!(config.server.dev);
        assert_eq!(config.logging.format, LogFormat::Human);

        let config = apply_args(
            AppConfig::default(),
            &ServeArgs {
                dev: true,
                log_format: Some(LogFormat::Json),
                ..args()
            },
        );
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
