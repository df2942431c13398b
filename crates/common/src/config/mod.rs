//! Configuration management for RefDisp
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with RED__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// OpenAlex client configuration
    #[serde(default)]
    pub openalex: OpenAlexConfig,

    /// Outbound request throttling
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Batch processing configuration
    #[serde(default)]
    pub batch: BatchConfig,

    /// Metric computation options
    #[serde(default)]
    pub metric: MetricConfig,

    /// HTTP server configuration (gateway only)
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAlexConfig {
    /// API base URL
    #[serde(default = "default_openalex_base_url")]
    pub base_url: String,

    /// Contact address sent as `mailto` (OpenAlex polite pool)
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_openalex_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Outbound throttling strategy
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleStrategy {
    TokenBucket,
    FixedInterval,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_throttle_strategy")]
    pub strategy: ThrottleStrategy,

    /// Token bucket refill rate
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Token bucket capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Minimum gap between requests for the fixed-interval strategy
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Pause between two consecutive DOIs in a batch
    #[serde(default = "default_pause_between_works")]
    pub pause_between_works_ms: u64,
}

/// How co-citation links are counted
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkCounting {
    /// Per-reference overlap summed over all positions (counts each
    /// undirected pair from both ends, density may exceed 1)
    #[default]
    Replicated,
    /// Each unordered pair of positions counted once, density clamped to 1
    Deduplicated,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricConfig {
    #[serde(default)]
    pub link_counting: LinkCounting,

    /// Append per-reference resolution failures to the log sink
    #[serde(default)]
    pub report_reference_failures: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted DOI batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Inbound requests per second
    #[serde(default = "default_server_rate_limit")]
    pub requests_per_second: u32,

    /// Inbound burst capacity
    #[serde(default = "default_server_burst")]
    pub burst: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_openalex_base_url() -> String { "https://api.openalex.org".to_string() }
fn default_openalex_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("refdisp/{}", crate::VERSION) }
fn default_throttle_strategy() -> ThrottleStrategy { ThrottleStrategy::TokenBucket }
fn default_requests_per_second() -> u32 { 10 }
fn default_burst() -> u32 { 10 }
fn default_min_interval_ms() -> u64 { 100 }
fn default_pause_between_works() -> u64 { 1000 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_batch_size() -> usize { 500 }
fn default_server_rate_limit() -> u32 { 5 }
fn default_server_burst() -> u32 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: default_openalex_base_url(),
            mailto: None,
            timeout_secs: default_openalex_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            strategy: default_throttle_strategy(),
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pause_between_works_ms: default_pause_between_works(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_batch_size: default_max_batch_size(),
            requests_per_second: default_server_rate_limit(),
            burst: default_server_burst(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with RED__ prefix
            // e.g., RED__OPENALEX__MAILTO=me@example.org
            .add_source(
                Environment::with_prefix("RED")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific config file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("RED")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the OpenAlex request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.openalex.timeout_secs)
    }

    /// Get the inter-work pause as Duration
    pub fn pause_between_works(&self) -> Duration {
        Duration::from_millis(self.batch.pause_between_works_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.openalex.base_url, "https://api.openalex.org");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.pause_between_works(), Duration::from_secs(1));
        assert_eq!(config.metric.link_counting, LinkCounting::Replicated);
        assert!(!config.metric.report_reference_failures);
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let json = r#"{ "metric": { "link_counting": "deduplicated" }, "throttle": { "strategy": "none" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.metric.link_counting, LinkCounting::Deduplicated);
        assert_eq!(config.throttle.strategy, ThrottleStrategy::None);
        assert_eq!(config.throttle.requests_per_second, 10);
        assert_eq!(config.server.port, 8080);
    }
}
