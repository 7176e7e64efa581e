//! Scripted page fetcher

use async_trait::async_trait;
use evidence_core::{FetchError, PageContent, PageFetcher};
use std::collections::HashMap;
use std::time::Duration;

/// Serves canned pages; URLs listed as slow never answer in time
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, PageContent>,
    slow: Vec<String>,
}

impl ScriptedFetcher {
    pub fn page(mut self, url: &str, text: &str, date: Option<&str>, author: Option<&str>) -> Self {
        self.pages.insert(
            url.to_string(),
            PageContent {
                text: text.to_string(),
                title: None,
                publication_date: date.map(str::to_string),
                author: author.map(str::to_string),
            },
        );
        self
    }

    pub fn slow(mut self, url: &str) -> Self {
        self.slow.push(url.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, FetchError> {
        if self.slow.iter().any(|u| u == url) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }
}
