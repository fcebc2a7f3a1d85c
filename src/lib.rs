//! Compliance-gated recipe extraction.
//!
//! A [`RecipeExtractor`] validates a recipe URL, asks the [`ComplianceGate`] for a
//! permit, renders the page, reads its regions into typed fields and returns an
//! [`ExtractionOutcome`] that always carries the gate decision.
//!
//! ```no_run
//! use recipe_extractor::{ExtractOptions, RecipeExtractor};
//!
//! # async fn run() -> Result<(), recipe_extractor::ExtractError> {
//! let extractor = RecipeExtractor::builder().build()?;
//! let outcome = extractor
//!     .extract(
//!         "https://cooking.nytimes.com/recipes/1015819-chocolate-chip-cookies",
//!         &ExtractOptions::default(),
//!     )
//!     .await;
//! if let Some(recipe) = outcome.recipe() {
//!     println!("{}", recipe.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compliance;
pub mod config;
pub mod error;
pub mod model;
pub mod parsing;
pub mod pipelines;
pub mod regions;
pub mod render;
pub mod site;
pub mod tools;

pub use builder::RecipeExtractorBuilder;
pub use compliance::{
    ComplianceDecision, ComplianceGate, ComplianceLimits, ComplianceStatus, Permit, UsageSnapshot,
};
pub use config::{load_config, ComplianceConfig, ExtractorConfig, RenderingConfig};
pub use error::{ErrorKind, ExtractError, RenderError};
pub use model::{
    ExtractionOutcome, KeepNote, NutritionInfo, Outcome, ParsedIngredient, RecipeDraft,
    RecipeRecord, Timing,
};
pub use parsing::{looks_like_quantity, looks_like_unit, parse_ingredient_line};
pub use pipelines::{ExtractOptions, RecipeExtractor};
pub use render::{ChromePageRenderer, HttpRenderer, Page, Renderer, RequestPacer};
pub use site::{validate_url, SupportedSite, UrlValidation, NYT_COOKING, SUPPORTED_SITES};
pub use tools::{ExtractRecipeArgs, RecipeTools};
