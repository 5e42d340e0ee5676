//! Page fetching: the collaborator boundary and the two-round orchestrator.
//!
//! A [`PageFetcher`] turns a batch of URLs into one [`FetchResult`] per URL.
//! Collaborators are owned by a [`FetcherHandle`], created once at startup
//! and shared by every request; the [`orchestrator`] drives the retry
//! algorithm on top of it.

pub mod crawl4ai;
pub mod http;
pub mod orchestrator;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::PipelineError;
use crate::types::FetchResult;

pub use crawl4ai::Crawl4AiFetcher;
pub use http::HttpFetcher;

/// A page-fetching collaborator.
///
/// Implementors render pages and report fit markdown per URL. All
/// implementations must be `Send + Sync`: one instance serves every
/// concurrent request.
pub trait PageFetcher: Send + Sync {
    /// Prepare the collaborator (connect, probe, allocate). Called once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FetcherInit`] if the collaborator is not usable.
    fn initialize(&self) -> impl Future<Output = Result<(), PipelineError>> + Send;

    /// Fetch every URL in `urls` as one batch.
    ///
    /// Must return exactly one result per input URL, in input order.
    /// Failures are reported as [`FetchResult::Failure`], never as errors.
    fn fetch_batch(&self, urls: &[String]) -> impl Future<Output = Vec<FetchResult>> + Send;

    /// Release collaborator resources. Called at most once.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Lifecycle owner for a [`PageFetcher`].
///
/// Initialisation is guarded by a one-time flag and teardown happens at
/// most once. After [`FetcherHandle::shutdown`], every batch fails.
pub struct FetcherHandle<F> {
    fetcher: F,
    started: AtomicBool,
    closed: AtomicBool,
}

impl<F: PageFetcher> FetcherHandle<F> {
    /// Initialise `fetcher` and wrap it in a handle.
    ///
    /// # Errors
    ///
    /// Propagates the collaborator's initialisation error; a handle is only
    /// returned for a ready collaborator.
    pub async fn start(fetcher: F) -> Result<Self, PipelineError> {
        let handle = Self {
            fetcher,
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        handle.ensure_started().await?;
        Ok(handle)
    }

    async fn ensure_started(&self) -> Result<(), PipelineError> {
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }
        self.fetcher.initialize().await?;
        self.started.store(true, Ordering::Release);
        tracing::info!(fetcher = self.fetcher.name(), "page fetcher initialised");
        Ok(())
    }

    /// Whether the collaborator is initialised and not yet shut down.
    pub fn is_ready(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    /// Access the wrapped collaborator.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch a batch through the collaborator.
    ///
    /// Guarantees one result per URL even if the collaborator misbehaves:
    /// missing results are padded with failures and extras are dropped.
    pub async fn fetch_batch(&self, urls: &[String]) -> Vec<FetchResult> {
        if !self.is_ready() {
            return urls
                .iter()
                .map(|_| FetchResult::failure("page fetcher is not running"))
                .collect();
        }

        let mut results = self.fetcher.fetch_batch(urls).await;
        if results.len() != urls.len() {
            tracing::warn!(
                fetcher = self.fetcher.name(),
                expected = urls.len(),
                got = results.len(),
                "fetcher returned mismatched result count"
            );
            results.resize_with(urls.len(), || {
                FetchResult::failure("no result returned for URL")
            });
        }
        results
    }

    /// Tear down the collaborator. Subsequent calls are no-ops.
    pub async fn shutdown(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if self.started.load(Ordering::Acquire) {
            self.fetcher.close().await;
            tracing::info!(fetcher = self.fetcher.name(), "page fetcher closed");
        }
    }
}

/// The collaborator selected by configuration.
pub enum Fetcher {
    /// Plain HTTP download and HTML extraction.
    Http(HttpFetcher),
    /// Headless-browser rendering through a Crawl4AI service.
    Crawl4Ai(Crawl4AiFetcher),
}

impl PageFetcher for Fetcher {
    async fn initialize(&self) -> Result<(), PipelineError> {
        match self {
            Self::Http(f) => f.initialize().await,
            Self::Crawl4Ai(f) => f.initialize().await,
        }
    }

    async fn fetch_batch(&self, urls: &[String]) -> Vec<FetchResult> {
        match self {
            Self::Http(f) => f.fetch_batch(urls).await,
            Self::Crawl4Ai(f) => f.fetch_batch(urls).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Http(f) => f.close().await,
            Self::Crawl4Ai(f) => f.close().await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Http(f) => f.name(),
            Self::Crawl4Ai(f) => f.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingFetcher {
        inits: AtomicUsize,
        closes: AtomicUsize,
        fail_init: bool,
        short_results: bool,
    }

    impl PageFetcher for CountingFetcher {
        async fn initialize(&self) -> Result<(), PipelineError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err(PipelineError::FetcherInit("browser missing".into()));
            }
            Ok(())
        }

        async fn fetch_batch(&self, urls: &[String]) -> Vec<FetchResult> {
            let n = if self.short_results { urls.len() / 2 } else { urls.len() };
            urls.iter()
                .take(n)
                .map(|u| FetchResult::Success {
                    content: format!("# {u}"),
                })
                .collect()
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example{i}.com")).collect()
    }

    #[tokio::test]
    async fn start_initialises_once() {
        let handle = FetcherHandle::start(CountingFetcher::default())
            .await
            .expect("start");
        handle.ensure_started().await.expect("idempotent");
        assert_eq!(handle.fetcher().inits.load(Ordering::SeqCst), 1);
        assert!(handle.is_ready());
    }

    #[tokio::test]
    async fn failed_initialisation_is_startup_error() {
        let fetcher = CountingFetcher {
            fail_init: true,
            ..Default::default()
        };
        let result = FetcherHandle::start(fetcher).await;
        assert!(matches!(result, Err(PipelineError::FetcherInit(_))));
    }

    #[tokio::test]
    async fn shutdown_closes_exactly_once() {
        let handle = FetcherHandle::start(CountingFetcher::default())
            .await
            .expect("start");
        handle.shutdown().await;
        handle.shutdown().await;
        assert_eq!(handle.fetcher().closes.load(Ordering::SeqCst), 1);
        assert!(!handle.is_ready());
    }

    #[tokio::test]
    async fn fetch_after_shutdown_fails_every_url() {
        let handle = FetcherHandle::start(CountingFetcher::default())
            .await
            .expect("start");
        handle.shutdown().await;
        let results = handle.fetch_batch(&urls(3)).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.is_success()));
    }

    #[tokio::test]
    async fn short_result_list_padded_with_failures() {
        let fetcher = CountingFetcher {
            short_results: true,
            ..Default::default()
        };
        let handle = FetcherHandle::start(fetcher).await.expect("start");
        let results = handle.fetch_batch(&urls(4)).await;
        assert_eq!(results.len(), 4);
        assert!(results[0].is_success());
        assert!(results[1].is_success());
        assert!(!results[2].is_success());
        assert!(!results[3].is_success());
    }
}
