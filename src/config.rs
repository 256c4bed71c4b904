use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hardcoded upstream this relay fronts. Overridable in the config file,
/// mostly so tests can point at a local mock.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

pub const DEFAULT_MODEL: &str = "meta/llama-3.1-405b-instruct";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub defaults: SamplingDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Outbound request timeout in seconds. Streaming completions can run
    /// for minutes, so this covers the whole response body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Values substituted for sampling fields the caller leaves out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    1.0
}

fn default_max_tokens() -> u64 {
    1024
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
            defaults: SamplingDefaults::default(),
        }
    }
}

impl RelayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the effective config: explicit path, then `nim-relay.toml` in
    /// the working directory, then built-in defaults. No config file is
    /// required to run.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        let cwd_config = Path::new("nim-relay.toml");
        if cwd_config.exists() {
            tracing::info!(path = %cwd_config.display(), "Loading config");
            return Self::load(cwd_config);
        }

        Ok(Self::default())
    }

    /// Apply `PORT` from the environment, overriding the file value.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.port = port.parse().map_err(|_| {
                RelayError::config(format!("PORT must be a number, got '{port}'"))
            })?;
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed, ready for path joining.
    pub fn upstream_base(&self) -> &str {
        self.upstream.base_url.trim_end_matches('/')
    }
}
