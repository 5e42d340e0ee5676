//! Plain HTTP page fetcher with User-Agent rotation.
//!
//! Downloads pages with a shared [`reqwest::Client`], extracts the main
//! content as markdown via [`crate::content`] and reports one
//! [`FetchResult`] per URL. Pages are fetched with bounded concurrency and
//! results keep input order. No JavaScript is executed, so overlay removal
//! and iframe processing do not apply.

use std::sync::OnceLock;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;

use crate::config::FetchConfig;
use crate::content::html_to_markdown;
use crate::error::PipelineError;
use crate::types::FetchResult;

use super::PageFetcher;

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Fetches pages directly over HTTP.
pub struct HttpFetcher {
    config: FetchConfig,
    client: OnceLock<reqwest::Client>,
}

impl HttpFetcher {
    /// Create a fetcher. The HTTP client is built by [`PageFetcher::initialize`].
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
        }
    }

    async fn fetch_one(&self, url: &str) -> FetchResult {
        let Some(client) = self.client.get() else {
            return FetchResult::failure("HTTP client not initialised");
        };

        let response = match client
            .get(url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchResult::failure(format!("request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failure(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !content_type.is_empty() && !content_type.contains("html") {
            return FetchResult::failure(format!("unsupported content type: {content_type}"));
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => return FetchResult::failure(format!("response read failed: {e}")),
        };

        tracing::trace!(url, bytes = html.len(), "page downloaded");

        match html_to_markdown(&html, url, &self.config) {
            Some(content) => FetchResult::Success { content },
            None => FetchResult::failure("no extractable content"),
        }
    }
}

impl PageFetcher for HttpFetcher {
    async fn initialize(&self) -> Result<(), PipelineError> {
        if self.client.get().is_some() {
            return Ok(());
        }
        let client = build_client(&self.config)?;
        // A concurrent initialiser may have won; either client is equivalent.
        let _ = self.client.set(client);
        Ok(())
    }

    async fn fetch_batch(&self, urls: &[String]) -> Vec<FetchResult> {
        // Built eagerly so the stream does not hold a higher-ranked closure,
        // which would make this future non-Send.
        let fetches: Vec<_> = urls.iter().map(|url| self.fetch_one(url)).collect();
        stream::iter(fetches)
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await
    }

    async fn close(&self) {}

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Build a [`reqwest::Client`] configured for page downloads.
///
/// # Errors
///
/// Returns [`PipelineError::FetcherInit`] if the client cannot be constructed.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.page_timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| PipelineError::FetcherInit(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetcherHandle;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> FetchConfig {
        FetchConfig {
            word_count_threshold: 0,
            content_filter_threshold: 0.0,
            page_timeout_seconds: 5,
            ..Default::default()
        }
    }

    async fn mount_html(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn random_user_agent_returns_valid_ua() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
        assert!(ua.contains("Mozilla/5.0"));
    }

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn fetch_before_initialise_fails() {
        let fetcher = HttpFetcher::new(config());
        let results = fetcher.fetch_batch(&["https://example.com".to_owned()]).await;
        assert_eq!(
            results,
            vec![FetchResult::failure("HTTP client not initialised")]
        );
    }

    #[tokio::test]
    async fn batch_preserves_input_order_and_classifies() {
        let server = MockServer::start().await;
        mount_html(&server, "/ok", "<html><body><h1>Hello</h1><p>World text</p></body></html>").await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
            )
            .mount(&server)
            .await;

        let handle = FetcherHandle::start(HttpFetcher::new(config()))
            .await
            .expect("start");
        let urls = vec![
            format!("{}/missing", server.uri()),
            format!("{}/ok", server.uri()),
            format!("{}/json", server.uri()),
        ];
        let results = handle.fetch_batch(&urls).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], FetchResult::failure("HTTP 404"));
        assert_eq!(
            results[1],
            FetchResult::Success {
                content: "# Hello\n\nWorld text".into()
            }
        );
        assert_eq!(
            results[2],
            FetchResult::failure("unsupported content type: application/json")
        );
    }

    #[tokio::test]
    async fn page_without_content_is_failure() {
        let server = MockServer::start().await;
        mount_html(&server, "/empty", "<html><body><script>x()</script></body></html>").await;

        let handle = FetcherHandle::start(HttpFetcher::new(config()))
            .await
            .expect("start");
        let results = handle.fetch_batch(&[format!("{}/empty", server.uri())]).await;
        assert_eq!(results, vec![FetchResult::failure("no extractable content")]);
    }

    #[tokio::test]
    async fn unreachable_host_is_failure() {
        let handle = FetcherHandle::start(HttpFetcher::new(config()))
            .await
            .expect("start");
        let results = handle.fetch_batch(&["http://127.0.0.1:9/".to_owned()]).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_success());
    }
}
