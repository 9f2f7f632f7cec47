//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use pagewire_ssr::AppConfig;

use crate::output::Output;

/// Config file names searched for when no path is given.
const CONFIG_NAMES: [&str; 3] = ["pagewire.toml", ".pagewire.toml", "pagewire.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Effective configuration, environment overrides applied.
    pub config: AppConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
}

impl Context {
    /// Load the configuration from `config_path`, or from the nearest config
    /// file in the current directory or its parents.
    pub fn load(config_path: Option<&Path>, output: Output) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                find_config(&cwd)
            }
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config file {}", path.display()));
        }

        let config = AppConfig::load(config_path.as_deref()).with_context(|| match &config_path {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to apply environment overrides".to_string(),
        })?;

        Ok(Self {
            config,
            config_path,
            output,
        })
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}
