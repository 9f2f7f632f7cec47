//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pagewire_http::HttpClientConfig;
use pagewire_navigator::NavigatorConfig;
use pagewire_observability::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding `server.bind`.
pub const ENV_BIND: &str = "PAGEWIRE_BIND";
/// Environment variable overriding `upstream.base_url`.
pub const ENV_UPSTREAM_URL: &str = "PAGEWIRE_UPSTREAM_URL";
/// Environment variable overriding `logging.format`.
pub const ENV_LOG_FORMAT: &str = "PAGEWIRE_LOG_FORMAT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub http: HttpClientConfig,
    pub upstream: UpstreamConfig,
    pub navigation: NavigatorConfig,
    pub logging: LogConfig,
}

/// Listener and document settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: String,
    /// Development mode: human-readable logs by default.
    pub dev: bool,
    /// Document title.
    pub app_name: String,
    /// Stylesheet linked from the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_path: Option<String>,
    /// Client bundle loaded by the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            dev: false,
            app_name: "Pagewire".to_string(),
            css_path: None,
            script_path: None,
        }
    }
}

/// The user service behind the backend-for-frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Artificial latency added before each upstream call.
    pub delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dummyjson.com".to_string(),
            delay_ms: 0,
        }
    }
}

impl UpstreamConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl AppConfig {
    /// Load from a `.toml` or `.json` file, then apply environment overrides.
    /// Without a path, start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a config file, choosing the format by extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Apply `PAGEWIRE_*` overrides read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.upstream.base_url = url;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format =
                format
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_LOG_FORMAT.to_string(),
                        value: format.clone(),
                    })?;
        }
        Ok(self)
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.server.bind = bind.into();
        self
    }

    pub fn with_dev(mut self, dev: bool) -> Self {
        self.server.dev = dev;
        self
    }

    pub fn with_upstream(mut self, base_url: impl Into<String>) -> Self {
        self.upstream.base_url = base_url.into();
        self
    }

    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.upstream.base_url, "https://dummyjson.com");
        assert_eq!(config.upstream.delay(), Duration::ZERO);
        assert_eq!(config.http.retries, 3);
        assert_eq!(config.navigation.deadline_ms, 1000);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_toml_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:8080"
            dev = true

            [http]
            retries = 1
            timeout_ms = 500

            [upstream]
            delay_ms = 700

            [navigation]
            deadline_ms = 1500

            [logging]
            format = "human"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert!(config.server.dev);
        assert_eq!(config.http.retries, 1);
        assert_eq!(config.http.timeout_ms, 500);
        assert_eq!(config.http.retry_delay_ms, 1000);
        assert_eq!(config.upstream.delay(), Duration::from_millis(700));
        assert_eq!(config.navigation.deadline_ms, 1500);
        assert_eq!(config.navigation.prefetch_delay_ms, 200);
        assert_eq!(config.logging.format, LogFormat::Human);
    }

    #[test]
    fn test_parse_json() {
        let config: AppConfig =
            serde_json::from_str(r#"{"upstream": {"base_url": "http://localhost:9000"}}"#).unwrap();
        assert_eq!(config.upstream.base_url, "http://localhost:9000");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BIND, "0.0.0.0:9999"),
            (ENV_UPSTREAM_URL, "http://mock"),
            (ENV_LOG_FORMAT, "human"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9999");
        assert_eq!(config.upstream.base_url, "http://mock");
        assert_eq!(config.logging.format, LogFormat::Human);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = AppConfig::default()
            .with_env_overrides(|key| (key == ENV_LOG_FORMAT).then(|| "xml".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join(format!("pagewire-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "server: {}").unwrap();
        let err = AppConfig::from_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file(Path::new("/nonexistent/pagewire.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
