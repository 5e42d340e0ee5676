//! Pipeline configuration with sensible defaults.
//!
//! [`PipelineConfig`] controls the SearXNG backend call, result limits,
//! caching and the run configuration handed to the page-fetching
//! collaborator ([`FetchConfig`]). The defaults match a local SearXNG
//! instance and a polite fetch profile.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Engines disabled by default on the SearXNG backend.
pub const DEFAULT_DISABLED_ENGINES: &[&str] = &[
    "wikipedia__general",
    "currency__general",
    "wikidata__general",
    "duckduckgo__general",
    "google__general",
    "lingva__general",
    "qwant__general",
    "startpage__general",
    "dictzone__general",
    "mymemory translated__general",
    "brave__general",
];

/// Engines enabled by default on the SearXNG backend.
pub const DEFAULT_ENABLED_ENGINES: &[&str] = &["baidu__general"];

/// User-Agent sent to the search backend.
pub const DEFAULT_SEARCH_USER_AGENT: &str = "aisearch/1.0.0";

/// Configuration for the search-then-fetch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Full SearXNG search endpoint, e.g. `http://localhost:8080/search`.
    pub searxng_api_base: String,
    /// `language` form field sent to SearXNG.
    pub language: String,
    /// `safesearch` form field (0, 1 or 2).
    pub safesearch: u8,
    /// `pageno` form field.
    pub pageno: u32,
    /// User-Agent for backend requests.
    pub user_agent: String,
    /// Backend request timeout in seconds.
    pub timeout_seconds: u64,
    /// Engines enabled unless a request overrides them.
    pub enabled_engines: Vec<String>,
    /// Engines disabled unless a request overrides them.
    pub disabled_engines: Vec<String>,
    /// Result limit used when a request omits `max_results`.
    pub default_max_results: usize,
    /// Maximum characters of normalised text returned as `answer`.
    pub answer_max_chars: usize,
    /// How long to cache backend candidates in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Run configuration for the page-fetching collaborator.
    pub fetch: FetchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            searxng_api_base: "http://localhost:8080/search".to_owned(),
            language: "zh".to_owned(),
            safesearch: 2,
            pageno: 1,
            user_agent: DEFAULT_SEARCH_USER_AGENT.to_owned(),
            timeout_seconds: 30,
            enabled_engines: DEFAULT_ENABLED_ENGINES.iter().map(|s| (*s).to_owned()).collect(),
            disabled_engines: DEFAULT_DISABLED_ENGINES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            default_max_results: 10,
            answer_max_chars: 1_000,
            cache_ttl_seconds: 0,
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `searxng_api_base` must not be empty
    /// - `default_max_results` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    /// - `safesearch` must be 0, 1 or 2
    /// - the nested [`FetchConfig`] must be valid
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.searxng_api_base.trim().is_empty() {
            return Err(PipelineError::Config(
                "searxng_api_base must not be empty".into(),
            ));
        }
        if self.default_max_results == 0 {
            return Err(PipelineError::Config(
                "default_max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(PipelineError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.safesearch > 2 {
            return Err(PipelineError::Config(
                "safesearch must be 0, 1 or 2".into(),
            ));
        }
        self.fetch.validate()
    }
}

/// Run configuration passed to the page-fetching collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Content-pruning threshold in `[0, 1]`.
    pub content_filter_threshold: f64,
    /// Minimum word count for a content block to be kept.
    pub word_count_threshold: usize,
    /// Tags removed before content extraction.
    pub excluded_tags: Vec<String>,
    /// Drop links that point outside the fetched page's host.
    pub exclude_external_links: bool,
    /// Remove overlays/popups before extraction (rendering collaborators only).
    pub remove_overlay_elements: bool,
    /// Inline iframe content (rendering collaborators only).
    pub process_iframes: bool,
    /// Per-page timeout in seconds.
    pub page_timeout_seconds: u64,
    /// Maximum pages fetched at once within a round.
    pub fetch_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            content_filter_threshold: 0.6,
            word_count_threshold: 10,
            excluded_tags: ["img", "header", "footer", "iframe", "nav"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            exclude_external_links: true,
            remove_overlay_elements: true,
            process_iframes: true,
            page_timeout_seconds: 30,
            fetch_concurrency: 8,
        }
    }
}

impl FetchConfig {
    /// Validates the fetch run configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.content_filter_threshold) {
            return Err(PipelineError::Config(
                "content_filter_threshold must be within [0, 1]".into(),
            ));
        }
        if self.page_timeout_seconds == 0 {
            return Err(PipelineError::Config(
                "page_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(PipelineError::Config(
                "fetch_concurrency must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated engine list, dropping blank entries.
pub fn parse_engine_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
