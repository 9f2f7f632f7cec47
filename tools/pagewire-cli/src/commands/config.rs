//! Configuration commands.

use std::net::SocketAddr;

use anyhow::{bail, Context as _, Result};
use pagewire_ssr::AppConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.debug(&format!("Loaded from {}", path.display())),
        None => ctx.output.debug("No config file found, using defaults"),
    }
    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
    println!("{}", rendered);
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    let problems = problems(&ctx.config);
    if problems.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for problem in &problems {
        ctx.output.list_item(problem);
    }
    bail!("{} configuration problem(s)", problems.len())
}

fn problems(config: &AppConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if config.server.bind.parse::<SocketAddr>().is_err() {
        problems.push(format!("server.bind is not a socket address: {}", config.server.bind));
    }
    let upstream = &config.upstream.base_url;
    if !(upstream.starts_with("http://") || upstream.starts_with("https://")) {
        problems.push(format!("upstream.base_url is not an http(s) URL: {}", upstream));
    }
    if config.http.timeout_ms == 0 {
        problems.push("http.timeout_ms must be greater than 0".to_string());
    }
    if config.navigation.deadline_ms == 0 {
        problems.push("navigation.deadline_ms must be greater than 0".to_string());
    }
    if let Err(e) = config.logging.env_filter() {
        problems.push(e.to_string());
    }

    problems
}
