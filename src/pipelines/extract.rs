use chrono::Utc;
use log::{debug, info, warn};
use scraper::Html;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::builder::RecipeExtractorBuilder;
use crate::compliance::ComplianceGate;
use crate::config::ExtractorConfig;
use crate::error::{ExtractError, RenderError};
use crate::model::{ExtractionOutcome, RecipeDraft};
use crate::parsing::parse_ingredient_line;
use crate::regions::{LinkedRecipe, PageMarkers};
use crate::render::{Page, Renderer, RequestPacer};
use crate::site::SupportedSite;

/// Per-call extraction switches
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Look for the nutrition block
    pub include_nutrition: bool,
    /// Look for rating and review count
    pub include_reviews: bool,
    /// Navigation timeout; the configured default when unset
    pub timeout: Option<Duration>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_nutrition: true,
            include_reviews: false,
            timeout: None,
        }
    }
}

/// Compliance-gated recipe extraction.
///
/// Each call runs validate -> gate -> render -> read regions -> assemble, billing
/// exactly one permit whenever a page load was attempted.
pub struct RecipeExtractor {
    pub(crate) config: ExtractorConfig,
    pub(crate) site: SupportedSite,
    pub(crate) gate: Arc<ComplianceGate>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) pacer: Arc<RequestPacer>,
    // one in-flight page per rendering context
    pub(crate) render_lock: Arc<Mutex<()>>,
}

impl RecipeExtractor {
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::default()
    }

    /// Extractor with the given configuration, its own gate and the configured renderer
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn site(&self) -> &SupportedSite {
        &self.site
    }

    pub fn gate(&self) -> &Arc<ComplianceGate> {
        &self.gate
    }

    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    /// Extract one recipe. Never fails: every fault comes back as a failure outcome.
    pub async fn extract(&self, url: &str, options: &ExtractOptions) -> ExtractionOutcome {
        let started = Instant::now();
        info!("Starting recipe extraction for {}", url);

        if !self.site.matches(url) {
            let error = ExtractError::InvalidUrl(url.to_string());
            warn!("{}", error);
            return ExtractionOutcome::failure(&error, Vec::new(), started.elapsed(), None);
        }

        let mut permit = match self.gate.admit(Utc::now()) {
            Ok(permit) => permit,
            Err(decision) => {
                let error = ExtractError::ComplianceRejected(decision.status.clone());
                let warnings = decision.warnings.clone();
                return ExtractionOutcome::failure(
                    &error,
                    warnings,
                    started.elapsed(),
                    Some(decision),
                );
            }
        };
        let decision = permit.decision().clone();

        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.rendering.request_timeout());
        permit.mark_attempted();
        let rendered = self.render(url, timeout).await;
        permit.record(Utc::now());

        let mut warnings = Vec::new();
        let result = rendered
            .and_then(|html| read_page(&html, options, &mut warnings))
            .and_then(|draft| draft.freeze(url, decision.clone(), Utc::now()));

        match result {
            Ok(recipe) => {
                info!(
                    "Extracted \"{}\" with {} ingredients and {} steps in {:.2?}",
                    recipe.title,
                    recipe.ingredients.len(),
                    recipe.instructions.len(),
                    started.elapsed()
                );
                ExtractionOutcome::success(recipe, warnings, started.elapsed(), decision)
            }
            Err(error) => {
                warn!("Extraction of {} failed: {}", url, error);
                ExtractionOutcome::failure(&error, warnings, started.elapsed(), Some(decision))
            }
        }
    }

    /// Load the page on its own task so that a caller dropping `extract` midway
    /// neither skips closing the page nor sees a renderer panic.
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, ExtractError> {
        let task = tokio::spawn(render_page(
            self.renderer.clone(),
            self.pacer.clone(),
            self.render_lock.clone(),
            url.to_string(),
            timeout,
        ));

        match task.await {
            Ok(loaded) => loaded,
            Err(e) if e.is_panic() => Err(ExtractError::Internal(panic_message(e.into_panic()))),
            Err(e) => Err(ExtractError::Internal(e.to_string())),
        }
    }
}

async fn render_page(
    renderer: Arc<dyn Renderer>,
    pacer: Arc<RequestPacer>,
    render_lock: Arc<Mutex<()>>,
    url: String,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let _context = render_lock.lock().await;
    pacer.wait().await;

    let mut page = OpenPage(Some(renderer.open_page().await?));
    debug!("Opened {} page for {}", renderer.name(), url);

    let loaded = page.load(&url, timeout).await;

    page.close().await;
    debug!("Closed {} page", renderer.name());
    loaded
}

/// Page that is closed on drop when it was not closed explicitly
struct OpenPage(Option<Box<dyn Page>>);

impl OpenPage {
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<String, ExtractError> {
        match self.0.as_deref_mut() {
            Some(page) => load(page, url, timeout).await,
            None => Err(RenderError::NotLoaded.into()),
        }
    }

    async fn close(&mut self) {
        if let Some(mut page) = self.0.take() {
            page.close().await;
        }
    }
}

impl Drop for OpenPage {
    fn drop(&mut self) {
        if let Some(mut page) = self.0.take() {
            debug!("Closing page abandoned mid-load");
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move { page.close().await });
            }
        }
    }
}

async fn load(page: &mut dyn Page, url: &str, timeout: Duration) -> Result<String, ExtractError> {
    let status = match tokio::time::timeout(timeout, page.goto(url, timeout)).await {
        Ok(status) => status?,
        Err(_) => return Err(RenderError::Timeout(timeout).into()),
    };

    match status {
        Some(code) if code < 400 => Ok(page.content().await?),
        Some(code) => Err(ExtractError::PageLoad(format!("HTTP {code}"))),
        None => Err(ExtractError::PageLoad("No response".to_string())),
    }
}

/// Read every region of the rendered page into a draft, collecting a warning per
/// missing optional region. Panics while reading are turned into internal errors.
fn read_page(
    html: &str,
    options: &ExtractOptions,
    warnings: &mut Vec<String>,
) -> Result<RecipeDraft, ExtractError> {
    catch_unwind(AssertUnwindSafe(|| read_regions(html, options, warnings)))
        .unwrap_or_else(|payload| Err(ExtractError::Internal(panic_message(payload))))
}

fn read_regions(
    html: &str,
    options: &ExtractOptions,
    warnings: &mut Vec<String>,
) -> Result<RecipeDraft, ExtractError> {
    let markers = PageMarkers::new()?;
    let document = Html::parse_document(html);
    let linked = LinkedRecipe::find(&document, &markers).unwrap_or_default();

    let mut optional = |region: &str, found: bool| {
        if !found {
            debug!("No {} found", region);
            warnings.push(format!("No {region} found"));
        }
    };

    let mut draft = RecipeDraft {
        title: markers.title(&document).or(linked.title),
        author: markers.author(&document).or(linked.author),
        description: markers.description(&document).or(linked.description),
        timing: markers.timing(&document).unwrap_or(linked.timing),
        yield_text: markers.servings(&document).or(linked.yield_text),
        ..RecipeDraft::default()
    };
    optional("author", draft.author.is_some());
    optional("description", draft.description.is_some());
    optional("timing information", !draft.timing.is_empty());
    optional("servings", draft.yield_text.is_some());

    draft.ingredients = markers
        .ingredient_lines(&document)
        .unwrap_or(linked.ingredients)
        .iter()
        .map(|line| parse_ingredient_line(line))
        .collect();
    draft.instructions = markers
        .instructions(&document)
        .unwrap_or(linked.instructions);

    for tag in markers.tags(&document).unwrap_or(linked.tags) {
        draft.add_tag(&tag);
    }
    optional("tags", !draft.tags.is_empty());

    if options.include_nutrition {
        draft.nutrition = markers.nutrition(&document).or(linked.nutrition);
        optional("nutrition information", draft.nutrition.is_some());
    }

    if options.include_reviews {
        draft.rating = markers.rating(&document).or(linked.rating);
        draft.review_count = markers.review_count(&document).or(linked.review_count);
        optional("rating", draft.rating.is_some());
        optional("review count", draft.review_count.is_some());
    }

    Ok(draft)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(message) => message.to_string(),
            Err(_) => "panic while extracting".to_string(),
        },
    }
}
