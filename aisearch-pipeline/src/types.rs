//! Core types: the logical search query, backend candidates, fetch outcomes,
//! and the Tavily-compatible request/response shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Logical query
// ---------------------------------------------------------------------------

/// Search topic. Anything other than `news` is treated as `general`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Topic {
    /// General web search.
    #[default]
    General,
    /// News search with a day-count time window.
    News,
}

impl Topic {
    /// Returns the wire name of this topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::News => "news",
        }
    }
}

impl From<String> for Topic {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("news") {
            Self::News
        } else {
            Self::General
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.as_str().to_owned()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical search request, before it is turned into a backend payload.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text query.
    pub text: String,
    /// Topic selector.
    pub topic: Topic,
    /// Generic time-range token (`day`, `week`, ...). Ignored for news.
    pub time_range: Option<String>,
    /// News time window in days. Only used when `topic` is [`Topic::News`].
    pub days: Option<u32>,
    /// Domains to restrict results to (`site:` terms).
    pub include_domains: Vec<String>,
    /// Domains to exclude from results (`-site:` terms).
    pub exclude_domains: Vec<String>,
    /// Backend engines to enable.
    pub enabled_engines: Vec<String>,
    /// Backend engines to disable.
    pub disabled_engines: Vec<String>,
}

// ---------------------------------------------------------------------------
// Search backend output
// ---------------------------------------------------------------------------

/// A ranked result returned by the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Result title.
    pub title: String,
    /// Result URL. May be empty when the backend omitted it.
    pub url: String,
    /// Snippet text supplied by the backend.
    pub snippet: String,
    /// 0-based position in the backend's ranking.
    pub rank: usize,
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// A URL submitted for fetching, with the attempt it belongs to (0 or 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    /// The URL to fetch.
    pub url: String,
    /// 0 for the first round, 1 for the retry round.
    pub attempt: u8,
}

/// Result of one fetch, as reported by a page-fetching collaborator.
///
/// Built once at the adapter boundary so the orchestrator never has to
/// inspect collaborator-specific response shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The page rendered and produced fit markdown.
    Success {
        /// Rendered markdown content.
        content: String,
    },
    /// The page could not be fetched or produced no usable content.
    Failure {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl FetchResult {
    /// Shorthand for building a failure.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Classified outcome of one URL in one fetch round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Content was obtained.
    Success {
        /// The URL that was fetched.
        url: String,
        /// Rendered markdown returned by the collaborator.
        raw_markdown: String,
    },
    /// The URL failed in this round.
    Failure {
        /// The URL that failed.
        url: String,
    },
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL that was fetched.
    pub url: String,
    /// Rendered markdown returned by the collaborator.
    pub raw_markdown: String,
}

/// Merged result of both fetch rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Successes from round 1 followed by successes from round 2.
    pub successes: Vec<FetchedPage>,
    /// URLs still failing after the retry round.
    pub failed_urls: Vec<String>,
}

/// Plain text produced from all successful pages of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedDocument {
    /// Concatenated, normalised plain text.
    pub content: String,
    /// Number of pages that contributed content.
    pub success_count: usize,
    /// Number of pages that failed permanently.
    pub failed_count: usize,
}

// ---------------------------------------------------------------------------
// Public request/response contract (Tavily-compatible)
// ---------------------------------------------------------------------------

/// Default news window when `topic = "news"` and no `days` are supplied.
pub const DEFAULT_NEWS_DAYS: u32 = 3;

fn default_search_depth() -> String {
    "basic".to_owned()
}

/// `POST /search` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search query text.
    pub query: String,
    /// `general` or `news`.
    #[serde(default)]
    pub topic: Topic,
    /// `basic` or `advanced`. Accepted for compatibility.
    #[serde(default = "default_search_depth")]
    pub search_depth: String,
    /// Maximum number of results. Defaults to the configured limit.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Generic time-range token for general searches.
    #[serde(default)]
    pub time_range: Option<String>,
    /// News window in days.
    #[serde(default)]
    pub days: Option<u32>,
    /// Include a synthesized answer.
    #[serde(default)]
    pub include_answer: bool,
    /// Include normalised page text on each result.
    #[serde(default)]
    pub include_raw_content: bool,
    /// Include images. Images are never extracted, so the list stays empty.
    #[serde(default)]
    pub include_images: bool,
    /// Domains to restrict results to.
    #[serde(default)]
    pub include_domains: Vec<String>,
    /// Domains to exclude.
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    /// Comma-separated backend engines to disable (overrides config).
    #[serde(default)]
    pub disabled_engines: Option<String>,
    /// Comma-separated backend engines to enable (overrides config).
    #[serde(default)]
    pub enabled_engines: Option<String>,
}

impl SearchRequest {
    /// Build a request with only the query set and all other fields defaulted.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            topic: Topic::General,
            search_depth: default_search_depth(),
            max_results: None,
            time_range: None,
            days: None,
            include_answer: false,
            include_raw_content: false,
            include_images: false,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            disabled_engines: None,
            enabled_engines: None,
        }
    }
}

/// A scored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Backend snippet.
    pub content: String,
    /// Rank-derived relevance score.
    pub score: f64,
    /// Normalised page text, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

/// `POST /search` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    /// Echo of the query text.
    pub query: String,
    /// Synthesized answer, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Image URLs. Always empty.
    pub images: Vec<String>,
    /// Scored results in rank order.
    pub results: Vec<ScoredResult>,
    /// Wall-clock time spent serving the request, in seconds.
    pub response_time: f64,
}

fn default_extract_depth() -> String {
    "basic".to_owned()
}

/// `POST /extract` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// URLs to fetch.
    pub urls: Vec<String>,
    /// Accepted for compatibility; images are never extracted.
    #[serde(default)]
    pub include_images: bool,
    /// `basic` or `advanced`. Accepted for compatibility.
    #[serde(default = "default_extract_depth")]
    pub extract_depth: String,
}

impl ExtractRequest {
    /// Build a request for the given URLs with defaults elsewhere.
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            include_images: false,
            extract_depth: default_extract_depth(),
        }
    }
}

/// One successfully extracted URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    /// The URL that was fetched.
    pub url: String,
    /// Normalised text of the request.
    pub raw_content: String,
    /// Image URLs. Always empty.
    pub images: Vec<String>,
}

/// One URL that could not be extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedResult {
    /// The URL that failed.
    pub url: String,
    /// Failure reason.
    pub error: String,
}

/// `POST /extract` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    /// Successfully extracted URLs.
    pub results: Vec<ExtractResult>,
    /// URLs that failed in both fetch rounds.
    pub failed_results: Vec<FailedResult>,
    /// Wall-clock time spent serving the request, in seconds.
    pub response_time: f64,
}
