//! Page rendering seam.
//!
//! The extractor never talks to a browser directly; it opens a [`Page`] from a
//! [`Renderer`], navigates it once and reads the serialized document back.

mod chrome;
mod http;
mod pacer;

pub use chrome::ChromePageRenderer;
pub use http::HttpRenderer;
pub use pacer::RequestPacer;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RenderingConfig;
use crate::error::RenderError;

/// A single browser tab (or equivalent) owned by one extraction
#[async_trait]
pub trait Page: Send {
    /// Navigate to `url`; returns the HTTP status, or `None` when there was no response
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<Option<u16>, RenderError>;

    /// Serialized document of the last successful navigation
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Release the page; must be safe to call after any failure
    async fn close(&mut self);
}

/// Source of pages
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in logs and status reports
    fn name(&self) -> &str;

    async fn open_page(&self) -> Result<Box<dyn Page>, RenderError>;
}

/// Pick the renderer described by the configuration: the Chrome page service when one
/// is configured, plain HTTP otherwise
pub fn renderer_from_config(config: &RenderingConfig) -> Result<Arc<dyn Renderer>, RenderError> {
    match &config.page_service_url {
        Some(service_url) => {
            info!("Rendering pages through Chrome page service at {}", service_url);
            Ok(Arc::new(ChromePageRenderer::new(service_url, config.headless)?))
        }
        None => {
            info!("Rendering pages with plain HTTP requests");
            Ok(Arc::new(HttpRenderer::new(&config.user_agent)?))
        }
    }
}
