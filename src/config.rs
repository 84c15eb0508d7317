// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration management for auditbot
//!
//! Values come from an optional TOML file and `AUDITBOT__*` environment
//! overrides (e.g. `AUDITBOT__FETCH__TIMEOUT_SECS=30`). Every field has a
//! default so an empty or missing file is valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::retry::RetryConfig;
use crate::rules::WCAG_TAGS;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Page fetching
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Rule engine and analyzer options
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Fix store location
    #[serde(default)]
    pub store: StoreConfig,

    /// LLM-backed recommendations
    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries per CORS proxy after its first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// First backoff delay (milliseconds); doubles on each retry
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default)]
    pub jitter: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy prefixes; the percent-encoded target URL is appended
    #[serde(default = "default_proxies")]
    pub proxies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            backoff_multiplier: default_multiplier(),
            jitter: false,
            user_agent: default_user_agent(),
            proxies: default_proxies(),
        }
    }
}

impl FetchConfig {
    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy settings applied to each proxy. Fails on a multiplier
    /// that is below 1.0 or not finite.
    pub fn retry_config(&self) -> Result<RetryConfig> {
        let retry = RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.backoff_multiplier,
            jitter: self.jitter,
            ..RetryConfig::default()
        };
        retry.validate()?;
        Ok(retry)
    }
}

fn default_timeout() -> u64 {
    15
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_backoff() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_user_agent() -> String {
    format!("auditbot/{}", env!("CARGO_PKG_VERSION"))
}

fn default_proxies() -> Vec<String> {
    vec![
        "https://api.allorigins.win/raw?url=".to_string(),
        "https://corsproxy.io/?".to_string(),
        "https://api.codetabs.com/v1/proxy?quest=".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Rule tags passed to the rule engine
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { tags: default_tags() }
    }
}

fn default_tags() -> Vec<String> {
    WCAG_TAGS.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding one custom-CSS blob per site
    #[serde(default = "default_store_dir")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_dir(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".auditbot")
        .join("sites")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendationConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound on issues sent for recommendations per run
    #[serde(default = "default_max_issues")]
    pub max_issues: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_issues: default_max_issues(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_issues() -> usize {
    5
}

impl Config {
    /// Load configuration from file, layering environment overrides on top
    pub fn load(path: &Path) -> Result<Self> {
        let mut builder = config::Config::builder();

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
        }

        let config = builder
            .add_source(config::Environment::with_prefix("AUDITBOT").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.fetch.retry_config()?;
        Ok(config)
    }
}

/// Default config file location (~/.config/auditbot/config.toml)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("auditbot")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.proxies.len(), 3);
        assert_eq!(config.analysis.tags.len(), WCAG_TAGS.len());
    }

    #[test]
    fn test_retry_config_from_fetch() {
        let fetch = FetchConfig::default();
        let retry = fetch.retry_config().unwrap();
        // 1s, 2s, 4s after the first attempt
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.schedule().last(), Some(&Duration::from_secs(4)));
        assert_eq!(retry.initial_backoff, Duration::from_secs(1));
        assert!(!retry.jitter);
    }

    #[test]
    fn test_negative_backoff_multiplier_rejected() {
        let fetch = FetchConfig {
            backoff_multiplier: -2.0,
            ..FetchConfig::default()
        };
        assert!(matches!(fetch.retry_config(), Err(Error::Config(_))));

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("tempfile");
        writeln!(file, "[fetch]\nbackoff_multiplier = -2.0").expect("write");
        assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/auditbot.toml")).expect("defaults");
        assert_eq!(config.fetch.timeout_secs, 15);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("tempfile");
        writeln!(file, "[fetch]\ntimeout_secs = 5\nproxies = []\n\n[analysis]\ntags = [\"wcag2a\"]").expect("write");

        let config = Config::load(file.path()).expect("load");
        assert_eq!(config.fetch.timeout_secs, 5);
        assert!(config.fetch.proxies.is_empty());
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.analysis.tags, vec!["wcag2a".to_string()]);
        assert_eq!(config.recommendations.max_issues, 5);
    }
}
