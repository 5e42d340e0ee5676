//! Two-round fetch orchestration with at-most-one retry.
//!
//! Round 1 submits every URL to the collaborator as a single batch and
//! waits for all of it. URLs that failed form the retry batch, which is
//! submitted exactly once. Successes are merged round 1 first, then
//! round 2, each in batch order.

use crate::error::PipelineError;
use crate::types::{FetchOutcome, FetchReport, FetchResult, FetchTarget, FetchedPage};

use super::{FetcherHandle, PageFetcher};

/// Fetch `urls` through `handle`, retrying the failed subset once.
///
/// # Errors
///
/// Returns [`PipelineError::AllFetchesFailed`] when no URL produced content
/// after both rounds. An empty `urls` list also yields this error.
pub async fn fetch_with_retry<F: PageFetcher>(
    handle: &FetcherHandle<F>,
    urls: &[String],
) -> Result<FetchReport, PipelineError> {
    tracing::info!(count = urls.len(), "fetching URLs");

    let first_round = targets(urls, 0);
    let outcomes = run_round(handle, &first_round).await;

    let mut report = FetchReport::default();
    let mut retry_urls = Vec::new();
    for outcome in outcomes {
        match outcome {
            FetchOutcome::Success { url, raw_markdown } => {
                report.successes.push(FetchedPage { url, raw_markdown });
            }
            FetchOutcome::Failure { url } => retry_urls.push(url),
        }
    }

    if !retry_urls.is_empty() {
        tracing::warn!(count = retry_urls.len(), "retrying failed URLs");
        let retry_round = targets(&retry_urls, 1);
        for outcome in run_round(handle, &retry_round).await {
            match outcome {
                FetchOutcome::Success { url, raw_markdown } => {
                    report.successes.push(FetchedPage { url, raw_markdown });
                }
                FetchOutcome::Failure { url } => report.failed_urls.push(url),
            }
        }
    }

    if report.successes.is_empty() {
        tracing::error!(failed = report.failed_urls.len(), "all URL fetches failed");
        return Err(PipelineError::AllFetchesFailed {
            failed_urls: report.failed_urls,
        });
    }

    tracing::info!(
        succeeded = report.successes.len(),
        failed = report.failed_urls.len(),
        "fetch complete"
    );
    Ok(report)
}

fn targets(urls: &[String], attempt: u8) -> Vec<FetchTarget> {
    urls.iter()
        .map(|url| FetchTarget {
            url: url.clone(),
            attempt,
        })
        .collect()
}

/// Run one atomic round: submit the whole batch, await all, classify.
async fn run_round<F: PageFetcher>(
    handle: &FetcherHandle<F>,
    batch: &[FetchTarget],
) -> Vec<FetchOutcome> {
    if batch.is_empty() {
        return Vec::new();
    }
    let urls: Vec<String> = batch.iter().map(|t| t.url.clone()).collect();
    let results = handle.fetch_batch(&urls).await;

    batch
        .iter()
        .zip(results)
        .map(|(target, result)| classify(target, result))
        .collect()
}

fn classify(target: &FetchTarget, result: FetchResult) -> FetchOutcome {
    match result {
        FetchResult::Success { content } => {
            tracing::debug!(url = %target.url, attempt = target.attempt, "fetched URL");
            FetchOutcome::Success {
                url: target.url.clone(),
                raw_markdown: content,
            }
        }
        FetchResult::Failure { reason } => {
            tracing::debug!(
                url = %target.url,
                attempt = target.attempt,
                reason = %reason,
                "URL fetch failed"
            );
            FetchOutcome::Failure {
                url: target.url.clone(),
            }
        }
    }
}
