//! CLI command implementations.

pub mod config;
pub mod resolve;
pub mod serve;

use clap::{Args, Subcommand};
use pagewire_observability::LogFormat;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides `server.bind`).
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Upstream user service URL (overrides `upstream.base_url`).
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Artificial upstream latency in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Development mode: human-readable logs unless a format is given.
    #[arg(long)]
    pub dev: bool,

    /// Script injected into every document in development mode.
    #[arg(long, requires = "dev")]
    pub dev_script: Option<String>,

    /// Log format: json or human.
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Path to resolve, e.g. `/users/7`.
    pub path: String,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
}
