//! Named operations exposed to tool callers, plus a JSON dispatcher over them.

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::compliance::UsageSnapshot;
use crate::config::ExtractorConfig;
use crate::model::ExtractionOutcome;
use crate::pipelines::{ExtractOptions, RecipeExtractor};
use crate::site::{validate_url, SupportedSite, UrlValidation, SUPPORTED_SITES};

pub const TOOL_NAMES: &[&str] = &[
    "extract_recipe",
    "validate_url",
    "get_compliance_status",
    "get_daily_usage",
    "get_server_status",
];

const FEATURES: &[&str] = &[
    "recipe_extraction",
    "url_validation",
    "compliance_monitoring",
    "usage_statistics",
    "rate_limiting",
];

/// Arguments of `extract_recipe`
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRecipeArgs {
    pub url: String,
    #[serde(default = "default_include_nutrition")]
    pub include_nutrition: bool,
    #[serde(default)]
    pub include_reviews: bool,
    /// Navigation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_include_nutrition() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl ExtractRecipeArgs {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            include_nutrition: default_include_nutrition(),
            include_reviews: false,
            timeout: default_timeout(),
        }
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            include_nutrition: self.include_nutrition,
            include_reviews: self.include_reviews,
            timeout: Some(Duration::from_secs(self.timeout)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateUrlArgs {
    url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceStatusReport {
    /// `compliant`, `rate_limited` or `blocked`
    pub status: &'static str,
    pub daily_usage: UsageSnapshot,
    pub server_health: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceSummary {
    pub daily_usage: u32,
    pub daily_limit: u32,
    pub remaining_today: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub status: &'static str,
    pub server_health: &'static str,
    pub renderer: String,
    pub configuration: ExtractorConfig,
    pub supported_sites: Vec<SupportedSite>,
    pub compliance: ComplianceSummary,
    pub features: Vec<&'static str>,
}

/// The extractor's operations as callable tools
pub struct RecipeTools {
    extractor: Arc<RecipeExtractor>,
}

impl RecipeTools {
    pub fn new(extractor: Arc<RecipeExtractor>) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &RecipeExtractor {
        &self.extractor
    }

    pub async fn extract_recipe(&self, args: &ExtractRecipeArgs) -> ExtractionOutcome {
        self.extractor.extract(&args.url, &args.options()).await
    }

    pub fn validate_url(&self, url: &str) -> UrlValidation {
        validate_url(url)
    }

    pub fn get_compliance_status(&self) -> ComplianceStatusReport {
        let now = Utc::now();
        let decision = self.extractor.gate().check(now);
        ComplianceStatusReport {
            status: decision.status.as_str(),
            daily_usage: self.extractor.gate().daily_usage_snapshot(now),
            server_health: "healthy",
        }
    }

    pub fn get_daily_usage(&self) -> UsageSnapshot {
        self.extractor.gate().daily_usage_snapshot(Utc::now())
    }

    pub fn get_server_status(&self) -> ServerStatus {
        let usage = self.get_daily_usage();
        ServerStatus {
            status: "running",
            server_health: "healthy",
            renderer: self.extractor.renderer_name().to_string(),
            configuration: self.extractor.config().clone(),
            supported_sites: SUPPORTED_SITES.to_vec(),
            compliance: ComplianceSummary {
                daily_usage: usage.usage_count,
                daily_limit: usage.daily_limit,
                remaining_today: usage.remaining,
            },
            features: FEATURES.to_vec(),
        }
    }

    /// Dispatch a tool call by name. Unknown tools and bad arguments come back as
    /// `{"error": ...}`.
    pub async fn call(&self, name: &str, arguments: Value) -> Value {
        debug!("Tool call {} with {}", name, arguments);
        match name {
            "extract_recipe" => match serde_json::from_value::<ExtractRecipeArgs>(arguments) {
                Ok(args) if args.timeout == 0 => {
                    invalid_arguments(name, "timeout must be at least 1 second")
                }
                Ok(args) => to_json(&self.extract_recipe(&args).await),
                Err(e) => invalid_arguments(name, e),
            },
            "validate_url" => match serde_json::from_value::<ValidateUrlArgs>(arguments) {
                Ok(args) => to_json(&self.validate_url(&args.url)),
                Err(e) => invalid_arguments(name, e),
            },
            "get_compliance_status" => to_json(&self.get_compliance_status()),
            "get_daily_usage" => to_json(&self.get_daily_usage()),
            "get_server_status" => to_json(&self.get_server_status()),
            _ => {
                warn!("Unknown tool requested: {}", name);
                json!({ "error": format!("Unknown tool: {name}") })
            }
        }
    }
}

fn invalid_arguments(tool: &str, reason: impl std::fmt::Display) -> Value {
    warn!("Invalid arguments for {}: {}", tool, reason);
    json!({ "error": format!("Invalid arguments for {tool}: {reason}") })
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}
