//! Crawl4AI rendering collaborator.
//!
//! Delegates page rendering to a Crawl4AI server: a headless browser loads
//! each page and a pruning content filter produces fit markdown. One batch
//! maps to one `POST /crawl` call.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::FetchConfig;
use crate::error::PipelineError;
use crate::types::FetchResult;

use super::PageFetcher;

#[derive(Debug, Deserialize)]
struct CrawlResponse {
    #[serde(default)]
    results: Vec<CrawlItem>,
}

#[derive(Debug, Deserialize)]
struct CrawlItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    markdown: Option<CrawlMarkdown>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Crawl4AI returns either a bare markdown string or a structured object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CrawlMarkdown {
    Plain(String),
    Structured {
        #[serde(default)]
        fit_markdown: Option<String>,
    },
}

impl CrawlMarkdown {
    /// Only pruned (fit) markdown counts as content.
    fn fit(self) -> Option<String> {
        match self {
            Self::Plain(_) => None,
            Self::Structured { fit_markdown } => fit_markdown,
        }
    }
}

/// Fetches pages through a Crawl4AI server.
pub struct Crawl4AiFetcher {
    base_url: String,
    config: FetchConfig,
    client: reqwest::Client,
}

impl Crawl4AiFetcher {
    /// Create a fetcher for the Crawl4AI server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FetcherInit`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: FetchConfig) -> Result<Self, PipelineError> {
        // Browser rendering of a whole batch can take several page timeouts.
        let timeout = Duration::from_secs(config.page_timeout_seconds.saturating_mul(4));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::FetcherInit(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            config,
            client,
        })
    }

    /// The request body for one batch.
    fn crawl_body(&self, urls: &[String]) -> Value {
        json!({
            "urls": urls,
            "browser_config": {
                "type": "BrowserConfig",
                "params": { "headless": true }
            },
            "crawler_config": {
                "type": "CrawlerRunConfig",
                "params": {
                    "word_count_threshold": self.config.word_count_threshold,
                    "excluded_tags": self.config.excluded_tags,
                    "exclude_external_links": self.config.exclude_external_links,
                    "remove_overlay_elements": self.config.remove_overlay_elements,
                    "process_iframes": self.config.process_iframes,
                    "page_timeout": self.config.page_timeout_seconds * 1000,
                    "cache_mode": "bypass",
                    "markdown_generator": {
                        "type": "DefaultMarkdownGenerator",
                        "params": {
                            "content_filter": {
                                "type": "PruningContentFilter",
                                "params": {
                                    "threshold": self.config.content_filter_threshold
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

impl PageFetcher for Crawl4AiFetcher {
    async fn initialize(&self) -> Result<(), PipelineError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::FetcherInit(format!("Crawl4AI unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(PipelineError::FetcherInit(format!(
                "Crawl4AI health check returned HTTP {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    async fn fetch_batch(&self, urls: &[String]) -> Vec<FetchResult> {
        if urls.is_empty() {
            return Vec::new();
        }

        let url = format!("{}/crawl", self.base_url);
        let response = match self
            .client
            .post(&url)
            .json(&self.crawl_body(urls))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Crawl4AI request failed");
                return fail_all(urls, &format!("crawl request failed: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Crawl4AI returned error status");
            return fail_all(urls, &format!("crawl service returned HTTP {}", status.as_u16()));
        }

        match response.json::<CrawlResponse>().await {
            Ok(parsed) => match_results(urls, parsed.results),
            Err(e) => fail_all(urls, &format!("invalid crawl response: {e}")),
        }
    }

    async fn close(&self) {}

    fn name(&self) -> &'static str {
        "crawl4ai"
    }
}

fn fail_all(urls: &[String], reason: &str) -> Vec<FetchResult> {
    urls.iter().map(|_| FetchResult::failure(reason)).collect()
}

/// Align crawl items with the requested URLs.
///
/// Items are matched by URL first. Remaining URLs take the leftover items
/// in order, since the service may report the final redirected URL.
fn match_results(urls: &[String], items: Vec<CrawlItem>) -> Vec<FetchResult> {
    let mut slots: Vec<Option<CrawlItem>> = items.into_iter().map(Some).collect();

    let mut matched: Vec<Option<CrawlItem>> = urls
        .iter()
        .map(|url| {
            slots
                .iter_mut()
                .find(|slot| matches!(slot, Some(item) if &item.url == url))
                .and_then(Option::take)
        })
        .collect();

    let mut leftovers = slots.into_iter().flatten();
    for slot in matched.iter_mut().filter(|slot| slot.is_none()) {
        *slot = leftovers.next();
    }

    matched
        .into_iter()
        .map(|item| match item {
            Some(item) => classify_item(item),
            None => FetchResult::failure("no result returned for URL"),
        })
        .collect()
}

fn classify_item(item: CrawlItem) -> FetchResult {
    if !item.success {
        return FetchResult::failure(
            item.error_message
                .unwrap_or_else(|| "crawl failed".to_owned()),
        );
    }
    match item.markdown.and_then(CrawlMarkdown::fit) {
        Some(content) => FetchResult::Success { content },
        None => FetchResult::failure("no fit markdown"),
    }
}
