//! Page fetching for evidence enrichment
//!
//! The only outbound network I/O in the crate, and only against URLs that
//! are already in the document pool.

pub mod html;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; ResourceRetriever/1.0)";

/// Text and metadata extracted from one fetched page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub text: String,
    pub title: Option<String>,
    /// `YYYY-MM-DD`
    pub publication_date: Option<String>,
    pub author: Option<String>,
}

/// Fetches and extracts one page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError>;
}

/// reqwest-backed fetcher with a fixed user agent and per-request timeout
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("text") {
            return Err(FetchError::ContentType(content_type));
        }

        let body = response.text().await?;
        let page = html::extract(&body);
        if page.text.is_empty() {
            return Err(FetchError::NoText);
        }

        debug!(url, chars = page.text.len(), "Fetched page");
        Ok(page)
    }
}
