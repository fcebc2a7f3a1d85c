use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Page, Renderer};
use crate::error::RenderError;

#[derive(Serialize)]
struct ContentRequest<'a> {
    url: &'a str,
    timeout_ms: u64,
    headless: bool,
    wait_until: &'a str,
}

#[derive(Deserialize)]
struct ContentResponse {
    content: String,
    // status of the rendered page; missing means the service got a normal response
    #[serde(default = "default_page_status")]
    status: Option<u16>,
}

fn default_page_status() -> Option<u16> {
    Some(200)
}

/// Renders pages in Chrome through a page service exposing `/api/fetch-content`
pub struct ChromePageRenderer {
    endpoint: String,
    headless: bool,
    client: Client,
}

impl ChromePageRenderer {
    pub fn new(service_url: &str, headless: bool) -> Result<Self, RenderError> {
        let endpoint = format!("{}/api/fetch-content", service_url.trim_end_matches('/'));
        let client = Client::builder()
            .build()
            .map_err(|e| RenderError::Setup(e.to_string()))?;
        Ok(Self {
            endpoint,
            headless,
            client,
        })
    }
}

#[async_trait]
impl Renderer for ChromePageRenderer {
    fn name(&self) -> &str {
        "chrome"
    }

    async fn open_page(&self) -> Result<Box<dyn Page>, RenderError> {
        Ok(Box::new(ChromePage {
            endpoint: self.endpoint.clone(),
            headless: self.headless,
            client: self.client.clone(),
            content: None,
        }))
    }
}

struct ChromePage {
    endpoint: String,
    headless: bool,
    client: Client,
    content: Option<String>,
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<Option<u16>, RenderError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&ContentRequest {
                url,
                timeout_ms,
                headless: self.headless,
                wait_until: "networkidle",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RenderError::Service(response.status()));
        }

        let rendered: ContentResponse = response.json().await?;
        debug!("Chrome rendered {} -> {:?}", url, rendered.status);
        self.content = Some(rendered.content);
        Ok(rendered.status)
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.content.clone().ok_or(RenderError::NotLoaded)
    }

    async fn close(&mut self) {
        self.content = None;
    }
}
