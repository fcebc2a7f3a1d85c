use std::sync::Arc;
use tokio::sync::Mutex;

use crate::compliance::ComplianceGate;
use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::pipelines::RecipeExtractor;
use crate::render::{renderer_from_config, Renderer, RequestPacer};
use crate::site::NYT_COOKING;

/// Builder for configuring a [`RecipeExtractor`]
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    config: Option<ExtractorConfig>,
    renderer: Option<Arc<dyn Renderer>>,
    gate: Option<Arc<ComplianceGate>>,
}

impl RecipeExtractorBuilder {
    /// Use this configuration instead of the defaults
    ///
    /// # Example
    /// ```
    /// use recipe_extractor::{ExtractorConfig, RecipeExtractor};
    ///
    /// let mut config = ExtractorConfig::default();
    /// config.compliance.daily_extraction_limit = 20;
    /// let extractor = RecipeExtractor::builder().config(config).build().unwrap();
    /// assert_eq!(extractor.gate().limits().daily_limit, 20);
    /// ```
    pub fn config(mut self, config: ExtractorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Render pages with this renderer instead of the one the configuration selects
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Share an existing compliance gate
    ///
    /// Extractors built with the same gate draw from one daily quota and one window.
    /// Without this, a fresh gate is built from the configured limits.
    pub fn gate(mut self, gate: Arc<ComplianceGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Result<RecipeExtractor, ExtractError> {
        let config = self.config.unwrap_or_default();

        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => renderer_from_config(&config.rendering)
                .map_err(|e| ExtractError::Internal(e.to_string()))?,
        };
        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(ComplianceGate::new(config.compliance.limits())));
        let pacer = Arc::new(RequestPacer::new(config.rendering.request_delay()));

        Ok(RecipeExtractor {
            config,
            site: NYT_COOKING,
            gate,
            renderer,
            pacer,
            render_lock: Arc::new(Mutex::new(())),
        })
    }
}
