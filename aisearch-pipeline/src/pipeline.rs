//! Request pipelines: search → fetch → normalise → assemble.
//!
//! A [`Pipeline`] is built once at startup and shared by every request. It
//! owns the backend client and a handle to the page-fetching collaborator;
//! it holds no per-request state.

use std::sync::Arc;
use std::time::Instant;

use crate::assemble::{AssembleOptions, assemble_extract, assemble_search, failed_results};
use crate::config::{PipelineConfig, parse_engine_list};
use crate::error::PipelineError;
use crate::fetch::orchestrator::fetch_with_retry;
use crate::fetch::{FetcherHandle, PageFetcher};
use crate::normalize::normalize;
use crate::query::build_payload;
use crate::searxng::SearchClient;
use crate::types::{
    AggregatedResponse, DEFAULT_NEWS_DAYS, ExtractRequest, ExtractResponse, SearchCandidate,
    SearchQuery, SearchRequest, Topic,
};

/// The search-then-fetch pipeline.
pub struct Pipeline<F> {
    search: SearchClient,
    fetcher: Arc<FetcherHandle<F>>,
    config: PipelineConfig,
}

impl<F: PageFetcher> Pipeline<F> {
    /// Build a pipeline around an already started fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `config` is invalid or the backend
    /// client cannot be built.
    pub fn new(config: PipelineConfig, fetcher: Arc<FetcherHandle<F>>) -> Result<Self, PipelineError> {
        config.validate()?;
        let search = SearchClient::new(&config)?;
        Ok(Self {
            search,
            fetcher,
            config,
        })
    }

    /// The shared fetcher handle.
    pub fn fetcher(&self) -> &Arc<FetcherHandle<F>> {
        &self.fetcher
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Serve one `/search` request.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRequest`] for a blank query.
    /// - [`PipelineError::BackendUnavailable`] / [`PipelineError::BackendError`]
    ///   when the search backend fails.
    /// - [`PipelineError::NoResults`] / [`PipelineError::NoValidUrls`] when the
    ///   backend returns nothing usable.
    /// - [`PipelineError::AllFetchesFailed`] when no page could be fetched.
    pub async fn search(&self, request: &SearchRequest) -> Result<AggregatedResponse, PipelineError> {
        let started = Instant::now();

        let query = self.logical_query(request);
        let payload = build_payload(&query, &self.config)?;
        tracing::info!(topic = %query.topic, "running search");

        let candidates = self.search.search(&payload).await?;
        if candidates.is_empty() {
            return Err(PipelineError::NoResults);
        }

        let limit = request
            .max_results
            .filter(|n| *n > 0)
            .unwrap_or(self.config.default_max_results);
        let selected = select_candidates(candidates, limit);
        if selected.is_empty() {
            return Err(PipelineError::NoValidUrls);
        }

        let urls: Vec<String> = selected.iter().map(|c| c.url.clone()).collect();
        let report = fetch_with_retry(&self.fetcher, &urls).await?;
        let document = normalize(&report);

        let options = AssembleOptions {
            include_raw_content: request.include_raw_content,
            include_answer: request.include_answer,
            answer_max_chars: self.config.answer_max_chars,
        };
        Ok(assemble_search(
            &request.query,
            &selected,
            &document,
            options,
            started.elapsed().as_secs_f64(),
        ))
    }

    /// Serve one `/extract` request.
    ///
    /// When every URL fails the response is still returned, with every URL
    /// listed in `failed_results`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] if no non-blank URL was given.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<ExtractResponse, PipelineError> {
        let started = Instant::now();

        let urls: Vec<String> = request
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .collect();
        if urls.is_empty() {
            return Err(PipelineError::InvalidRequest("urls must not be empty".into()));
        }

        tracing::info!(count = urls.len(), "running extract");
        match fetch_with_retry(&self.fetcher, &urls).await {
            Ok(report) => {
                let document = normalize(&report);
                Ok(assemble_extract(&report, &document, started.elapsed().as_secs_f64()))
            }
            Err(PipelineError::AllFetchesFailed { failed_urls }) => Ok(ExtractResponse {
                results: Vec::new(),
                failed_results: failed_results(&failed_urls),
                response_time: started.elapsed().as_secs_f64(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Map a public request onto the logical query, applying engine and
    /// news-window defaults.
    fn logical_query(&self, request: &SearchRequest) -> SearchQuery {
        let days = match request.topic {
            Topic::News => Some(request.days.unwrap_or(DEFAULT_NEWS_DAYS)),
            Topic::General => request.days,
        };
        SearchQuery {
            text: request.query.trim().to_owned(),
            topic: request.topic,
            time_range: request.time_range.clone(),
            days,
            include_domains: request.include_domains.clone(),
            exclude_domains: request.exclude_domains.clone(),
            enabled_engines: request
                .enabled_engines
                .as_deref()
                .map(parse_engine_list)
                .unwrap_or_else(|| self.config.enabled_engines.clone()),
            disabled_engines: request
                .disabled_engines
                .as_deref()
                .map(parse_engine_list)
                .unwrap_or_else(|| self.config.disabled_engines.clone()),
        }
    }
}

/// Cap candidates to `limit` in backend order, then drop those without a URL.
fn select_candidates(candidates: Vec<SearchCandidate>, limit: usize) -> Vec<SearchCandidate> {
    candidates
        .into_iter()
        .take(limit)
        .filter(|c| !c.url.is_empty())
        .collect()
}
