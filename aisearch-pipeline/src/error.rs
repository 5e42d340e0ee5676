//! Error types for the aisearch-pipeline crate.
//!
//! All errors use stable string messages suitable for display to callers
//! and programmatic handling. Per-URL fetch failures are not errors: they
//! are reported as data in the response. Only the variants below escalate
//! to a request-level failure.

/// Errors that can occur while serving a search or extract request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The inbound request is malformed (e.g. empty query text).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The search backend could not be reached or the call failed in transit.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The search backend answered with a non-success status.
    #[error("search backend returned HTTP {status}: {body}")]
    BackendError {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The search succeeded but returned no results at all.
    #[error("no search results found")]
    NoResults,

    /// The search returned results but none of them carried a usable URL.
    #[error("no valid URLs found in search results")]
    NoValidUrls,

    /// Every URL failed in both fetch rounds.
    #[error("all URL fetches failed ({} urls)", failed_urls.len())]
    AllFetchesFailed {
        /// The URLs that never produced content, in retry order.
        failed_urls: Vec<String>,
    },

    /// The page-fetching collaborator could not be initialised.
    #[error("fetcher initialisation failed: {0}")]
    FetcherInit(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for aisearch-pipeline results.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_backend_unavailable() {
        let err = PipelineError::BackendUnavailable("connection refused".into());
        assert_eq!(
            err.to_string(),
            "search backend unavailable: connection refused"
        );
    }

    #[test]
    fn display_backend_error_includes_status_and_body() {
        let err = PipelineError::BackendError {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(
            err.to_string(),
            "search backend returned HTTP 503: maintenance"
        );
    }

    #[test]
    fn display_no_results() {
        assert_eq!(PipelineError::NoResults.to_string(), "no search results found");
        assert_eq!(
            PipelineError::NoValidUrls.to_string(),
            "no valid URLs found in search results"
        );
    }

    #[test]
    fn display_all_fetches_failed_counts_urls() {
        let err = PipelineError::AllFetchesFailed {
            failed_urls: vec!["https://a.com".into(), "https://b.com".into()],
        };
        assert_eq!(err.to_string(), "all URL fetches failed (2 urls)");
    }

    #[test]
    fn display_config() {
        let err = PipelineError::Config("default_max_results must be > 0".into());
        assert_eq!(err.to_string(), "config error: default_max_results must be > 0");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineError>();
    }
}
