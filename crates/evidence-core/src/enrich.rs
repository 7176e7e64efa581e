//! Bounded-concurrency page enrichment
//!
//! A fixed number of fetches run at once, each under its own timeout. A
//! failed or timed-out fetch only loses its own URL; the join point gathers
//! whatever succeeded into a map keyed by URL.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::FetchError;
use crate::fetch::{PageContent, PageFetcher};

pub struct Enricher {
    fetcher: Arc<dyn PageFetcher>,
    workers: usize,
    timeout: Duration,
}

impl Enricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, workers: usize, timeout: Duration) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            timeout,
        }
    }

    pub fn from_config(fetcher: Arc<dyn PageFetcher>, config: &RetrievalConfig) -> Self {
        Self::new(fetcher, config.fetch_workers, config.fetch_timeout())
    }

    /// Fetch every distinct non-empty URL
    ///
    /// Only pages with text are returned. No retries; worst-case latency is
    /// `timeout * ceil(urls / workers)`.
    pub async fn fetch_all(&self, urls: &[String]) -> HashMap<String, PageContent> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = urls
            .iter()
            .filter(|u| !u.trim().is_empty())
            .filter(|u| seen.insert(*u))
            .cloned()
            .collect();
        if unique.is_empty() {
            return HashMap::new();
        }

        let requested = unique.len();
        let outcomes: Vec<(String, Result<PageContent, FetchError>)> = stream::iter(unique)
            .map(|url| {
                let fetcher = Arc::clone(&self.fetcher);
                let limit = self.timeout;
                async move {
                    let outcome = match tokio::time::timeout(limit, fetcher.fetch(&url)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout(limit.as_secs())),
                    };
                    (url, outcome)
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut pages = HashMap::with_capacity(outcomes.len());
        for (url, outcome) in outcomes {
            match outcome {
                Ok(page) if !page.text.trim().is_empty() => {
                    pages.insert(url, page);
                }
                Ok(_) => debug!(url = url.as_str(), "Fetched page has no text"),
                Err(e) => debug!(url = url.as_str(), error = %e, "Fetch failed"),
            }
        }

        info!("Enriched {} of {} URLs", pages.len(), requested);
        pages
    }
}
