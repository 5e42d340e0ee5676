//! SearXNG search backend client.
//!
//! Posts a form-encoded [`SearxngPayload`] to the configured endpoint and
//! parses the JSON `results` array into ranked [`SearchCandidate`]s. There
//! is no retry at this layer: a transport failure or non-success status is
//! terminal for the request.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::{CacheKey, CandidateCache};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::query::SearxngPayload;
use crate::types::SearchCandidate;

/// Maximum number of body bytes kept in a [`PipelineError::BackendError`].
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Client for the SearXNG JSON API.
#[derive(Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    api_base: String,
    cache: Option<CandidateCache>,
}

impl SearchClient {
    /// Build a client from pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.searxng_api_base.trim_end_matches('/').to_owned(),
            cache: CandidateCache::new(config.cache_ttl_seconds),
        })
    }

    /// The endpoint this client posts to.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Run one search and return candidates in backend rank order.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::BackendUnavailable`] if the request cannot be sent,
    ///   the body cannot be read, or the body is not valid SearXNG JSON.
    /// - [`PipelineError::BackendError`] on a non-success HTTP status.
    pub async fn search(
        &self,
        payload: &SearxngPayload,
    ) -> Result<Vec<SearchCandidate>, PipelineError> {
        let key = CacheKey::new(payload);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(count = hit.len(), "search cache hit");
                return Ok(hit);
            }
        }

        tracing::trace!(query = payload.query_text(), "SearXNG search");

        let response = self
            .client
            .post(&self.api_base)
            .header(reqwest::header::COOKIE, &payload.cookie)
            .form(&payload.form)
            .send()
            .await
            .map_err(|e| PipelineError::BackendUnavailable(format!("SearXNG request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            PipelineError::BackendUnavailable(format!("SearXNG response read failed: {e}"))
        })?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "SearXNG returned error status");
            return Err(PipelineError::BackendError {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        tracing::trace!(bytes = body.len(), "SearXNG response received");

        let candidates = parse_searxng_json(&body)?;
        if let Some(cache) = &self.cache {
            cache.insert(key, candidates.clone()).await;
        }
        Ok(candidates)
    }
}

/// Parse a SearXNG JSON body into ranked candidates.
///
/// Results without a URL are kept with an empty `url` so that rank
/// positions match the backend's ordering; callers filter them.
pub(crate) fn parse_searxng_json(body: &str) -> Result<Vec<SearchCandidate>, PipelineError> {
    let parsed: SearxngResponse = serde_json::from_str(body).map_err(|e| {
        PipelineError::BackendUnavailable(format!("invalid SearXNG JSON response: {e}"))
    })?;

    Ok(parsed
        .results
        .into_iter()
        .enumerate()
        .map(|(rank, r)| SearchCandidate {
            title: r.title.trim().to_owned(),
            url: r.url.unwrap_or_default().trim().to_owned(),
            snippet: r.content.unwrap_or_default().trim().to_owned(),
            rank,
        })
        .collect())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_payload;
    use crate::types::SearchQuery;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> PipelineConfig {
        PipelineConfig {
            searxng_api_base: format!("{}/search", server.uri()),
            timeout_seconds: 5,
            ..Default::default()
        }
    }

    fn payload(text: &str) -> SearxngPayload {
        let query = SearchQuery {
            text: text.into(),
            enabled_engines: vec!["baidu__general".into()],
            disabled_engines: vec!["google__general".into()],
            ..Default::default()
        };
        build_payload(&query, &PipelineConfig::default()).expect("build")
    }

    #[test]
    fn parse_results_in_rank_order() {
        let body = r#"{"results": [
            {"title": "A", "url": "https://a.com", "content": "first"},
            {"title": "B", "url": "https://b.com", "content": "second"}
        ]}"#;
        let candidates = parse_searxng_json(body).expect("parse");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[0].url, "https://a.com");
        assert_eq!(candidates[1].snippet, "second");
        assert_eq!(candidates[1].rank, 1);
    }

    #[test]
    fn parse_tolerates_missing_fields() {
        let body = r#"{"results": [{"title": "No url"}, {"url": "https://x.com"}]}"#;
        let candidates = parse_searxng_json(body).expect("parse");
        assert_eq!(candidates[0].url, "");
        assert_eq!(candidates[1].title, "");
        assert_eq!(candidates[1].snippet, "");
    }

    #[test]
    fn parse_missing_results_array_is_empty() {
        let candidates = parse_searxng_json(r#"{"query": "x"}"#).expect("parse");
        assert!(candidates.is_empty());
    }

    #[test]
    fn parse_invalid_json_is_backend_unavailable() {
        let err = parse_searxng_json("<html>oops</html>").unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn search_posts_form_with_cookie_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header(
                "cookie",
                "disabled_engines=google__general;enabled_engines=baidu__general;method=POST",
            ))
            .and(header("user-agent", "aisearch/1.0.0"))
            .and(body_string_contains("format=json"))
            .and(body_string_contains("category_general=1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"title": "A", "url": "https://a.com", "content": "a"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::new(&config_for(&server)).expect("client");
        let candidates = client.search(&payload("rust")).await.expect("search");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "A");
    }

    #[tokio::test]
    async fn non_success_status_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = SearchClient::new(&config_for(&server)).expect("client");
        let err = client.search(&payload("rust")).await.unwrap_err();
        match err {
            PipelineError::BackendError { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let config = PipelineConfig {
            searxng_api_base: "http://127.0.0.1:9/search".into(),
            timeout_seconds: 2,
            ..Default::default()
        };
        let client = SearchClient::new(&config).expect("client");
        let err = client.search(&payload("rust")).await.unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn cached_candidates_skip_second_backend_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"title": "A", "url": "https://a.com", "content": "a"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let config = PipelineConfig {
            cache_ttl_seconds: 60,
            ..config_for(&server)
        };
        let client = SearchClient::new(&config).expect("client");
        let first = client.search(&payload("cached")).await.expect("first");
        let second = client.search(&payload("cached")).await.expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let config = PipelineConfig {
            searxng_api_base: "http://localhost:8080/search/".into(),
            ..Default::default()
        };
        let client = SearchClient::new(&config).expect("client");
        assert_eq!(client.api_base(), "http://localhost:8080/search");
    }
}
