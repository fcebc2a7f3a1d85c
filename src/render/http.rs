use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::{Page, Renderer};
use crate::error::RenderError;

/// Loads pages with a plain HTTP GET; no JavaScript is executed
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(user_agent: &str) -> Result<Self, RenderError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| RenderError::Setup(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_page(&self) -> Result<Box<dyn Page>, RenderError> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            body: None,
        }))
    }
}

struct HttpPage {
    client: Client,
    body: Option<String>,
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<Option<u16>, RenderError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();
        debug!("GET {} -> {}", url, status);

        self.body = Some(response.text().await?);
        Ok(Some(status.as_u16()))
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.body.clone().ok_or(RenderError::NotLoaded)
    }

    async fn close(&mut self) {
        self.body = None;
    }
}
