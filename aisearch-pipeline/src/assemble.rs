//! Response assembly: rank-based scoring and the public response shapes.

use crate::types::{
    AggregatedResponse, ExtractResponse, ExtractResult, FailedResult, FetchReport,
    NormalizedDocument, ScoredResult, SearchCandidate,
};

/// Score given to the top-ranked result.
pub const BASE_SCORE: f64 = 1.0;

/// Score decrement per rank position.
pub const SCORE_STEP: f64 = 0.05;

/// Reason reported for every URL that never produced content.
pub const FETCH_FAILURE_REASON: &str = "failed to fetch content";

/// Ordinal relevance score for a 0-based rank. Not a calibrated probability.
pub fn rank_score(rank: usize) -> f64 {
    BASE_SCORE - rank as f64 * SCORE_STEP
}

/// Options controlling the optional parts of a search response.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions {
    /// Attach the normalised text to every result.
    pub include_raw_content: bool,
    /// Return the normalised text as `answer`.
    pub include_answer: bool,
    /// Maximum characters in `answer`.
    pub answer_max_chars: usize,
}

/// Build the `/search` response.
///
/// `candidates` must already be capped and filtered; their order is the
/// scoring order. Raw content is request-wide: every result carries the
/// same normalised text.
pub fn assemble_search(
    query: &str,
    candidates: &[SearchCandidate],
    document: &NormalizedDocument,
    options: AssembleOptions,
    response_time: f64,
) -> AggregatedResponse {
    let results = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| ScoredResult {
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            content: candidate.snippet.clone(),
            score: rank_score(i),
            raw_content: options
                .include_raw_content
                .then(|| document.content.clone()),
        })
        .collect();

    let answer = options
        .include_answer
        .then(|| document.content.chars().take(options.answer_max_chars).collect::<String>());

    AggregatedResponse {
        query: query.to_owned(),
        answer,
        images: Vec::new(),
        results,
        response_time,
    }
}

/// Build the `/extract` response from a fetch report.
pub fn assemble_extract(
    report: &FetchReport,
    document: &NormalizedDocument,
    response_time: f64,
) -> ExtractResponse {
    ExtractResponse {
        results: report
            .successes
            .iter()
            .map(|page| ExtractResult {
                url: page.url.clone(),
                raw_content: document.content.clone(),
                images: Vec::new(),
            })
            .collect(),
        failed_results: failed_results(&report.failed_urls),
        response_time,
    }
}

/// Pair each failed URL with the generic failure reason.
pub fn failed_results(urls: &[String]) -> Vec<FailedResult> {
    urls.iter()
        .map(|url| FailedResult {
            url: url.clone(),
            error: FETCH_FAILURE_REASON.to_owned(),
        })
        .collect()
}
