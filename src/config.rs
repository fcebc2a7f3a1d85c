use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::compliance::ComplianceLimits;
use crate::error::ExtractError;

/// Main extractor configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ExtractorConfig {
    /// Daily quota and sliding window limits
    #[serde(default)]
    pub compliance: ComplianceConfig,
    /// Page rendering behaviour
    #[serde(default)]
    pub rendering: RenderingConfig,
}

/// Self-imposed usage policy
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComplianceConfig {
    /// Maximum recorded extractions per UTC day
    #[serde(default = "default_daily_extraction_limit")]
    pub daily_extraction_limit: u32,
    /// Length of the sliding rate-limit window in seconds
    #[serde(default = "default_rate_limit_window_seconds")]
    pub rate_limit_window_seconds: u64,
    /// Maximum extractions inside one window
    #[serde(default = "default_max_requests_per_window")]
    pub max_requests_per_window: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            daily_extraction_limit: default_daily_extraction_limit(),
            rate_limit_window_seconds: default_rate_limit_window_seconds(),
            max_requests_per_window: default_max_requests_per_window(),
        }
    }
}

impl ComplianceConfig {
    pub fn limits(&self) -> ComplianceLimits {
        ComplianceLimits {
            daily_limit: self.daily_extraction_limit,
            window: Duration::from_secs(self.rate_limit_window_seconds),
            max_per_window: self.max_requests_per_window,
        }
    }
}

/// Configuration for the page renderer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderingConfig {
    /// Ask the page service for a headless browser
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Default navigation timeout in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Pause enforced between successive page loads, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// User agent sent with plain HTTP page loads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Base URL of a Chrome page service; plain HTTP rendering when unset
    #[serde(default)]
    pub page_service_url: Option<String>,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            request_timeout_seconds: default_request_timeout_seconds(),
            request_delay_ms: default_request_delay_ms(),
            user_agent: default_user_agent(),
            page_service_url: None,
        }
    }
}

impl RenderingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

// Default value functions
fn default_daily_extraction_limit() -> u32 {
    50
}

fn default_rate_limit_window_seconds() -> u64 {
    60
}

fn default_max_requests_per_window() -> u32 {
    10
}

fn default_headless() -> bool {
    true
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Recipe Extractor/1.0 (Educational Use)".to_string()
}

impl ExtractorConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE__COMPLIANCE__DAILY_EXTRACTION_LIMIT
    pub fn load() -> Result<Self, ExtractError> {
        Ok(load_config()?)
    }
}

/// Load configuration from file and environment variables
///
/// See [`ExtractorConfig::load`] for the source priority.
pub fn load_config() -> Result<ExtractorConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE__RENDERING__HEADLESS
        .add_source(
            Environment::with_prefix("RECIPE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
