//! End-to-end tests for the search and extract pipelines.
//!
//! A wiremock server plays both the SearXNG backend and the pages being
//! fetched; pages go through the real [`HttpFetcher`].

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use aisearch_pipeline::{
    ExtractRequest, FetchConfig, FetcherHandle, HttpFetcher, Pipeline, PipelineConfig,
    PipelineError, SearchRequest,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(n: usize) -> String {
    format!("<html><body><h1>Page {n}</h1><p>Body text {n}</p></body></html>")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer, results: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .mount(server)
        .await;
}

async fn pipeline_for(server: &MockServer) -> Pipeline<HttpFetcher> {
    let fetch = FetchConfig {
        word_count_threshold: 0,
        content_filter_threshold: 0.0,
        page_timeout_seconds: 5,
        ..Default::default()
    };
    let config = PipelineConfig {
        searxng_api_base: format!("{}/search", server.uri()),
        timeout_seconds: 5,
        fetch: fetch.clone(),
        ..Default::default()
    };
    let handle = FetcherHandle::start(HttpFetcher::new(fetch))
        .await
        .expect("fetcher start");
    Pipeline::new(config, Arc::new(handle)).expect("pipeline")
}

#[tokio::test]
async fn search_caps_results_and_scores_by_rank() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_search(
        &server,
        json!([
            {"title": "Zero", "url": format!("{base}/p0"), "content": "first"},
            {"title": "One", "url": format!("{base}/p1"), "content": "second"},
            {"title": "Two", "url": format!("{base}/p2"), "content": "third"}
        ]),
    )
    .await;
    for n in 0..3 {
        mount_page(&server, &format!("/p{n}"), page(n)).await;
    }

    let pipeline = pipeline_for(&server).await;
    let mut request = SearchRequest::new("rust");
    request.max_results = Some(2);
    request.include_raw_content = true;
    request.include_answer = true;

    let response = pipeline.search(&request).await.expect("search");
    assert_eq!(response.query, "rust");
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].title, "Zero");
    assert!((response.results[0].score - 1.0).abs() < 1e-9);
    assert!((response.results[1].score - 0.95).abs() < 1e-9);

    let expected = "Page 0\nBody text 0\n==========\nPage 1\nBody text 1";
    assert_eq!(response.results[0].raw_content.as_deref(), Some(expected));
    assert_eq!(response.results[1].raw_content.as_deref(), Some(expected));
    assert_eq!(response.answer.as_deref(), Some(expected));
    assert!(response.images.is_empty());
    assert!(response.response_time >= 0.0);
}

#[tokio::test]
async fn search_retries_failed_page_once() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_search(
        &server,
        json!([{"title": "Flaky", "url": format!("{base}/flaky"), "content": ""}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", page(7)).await;

    let pipeline = pipeline_for(&server).await;
    let mut request = SearchRequest::new("flaky");
    request.include_raw_content = true;

    let response = pipeline.search(&request).await.expect("search");
    assert_eq!(
        response.results[0].raw_content.as_deref(),
        Some("Page 7\nBody text 7")
    );
}

#[tokio::test]
async fn search_with_every_page_failing_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_search(
        &server,
        json!([{"title": "Gone", "url": format!("{base}/gone"), "content": ""}]),
    )
    .await;

    let pipeline = pipeline_for(&server).await;
    let err = pipeline
        .search(&SearchRequest::new("gone"))
        .await
        .unwrap_err();
    match err {
        PipelineError::AllFetchesFailed { failed_urls } => {
            assert_eq!(failed_urls, vec![format!("{base}/gone")]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_backend_results_are_no_results() {
    let server = MockServer::start().await;
    mount_search(&server, json!([])).await;

    let pipeline = pipeline_for(&server).await;
    let err = pipeline
        .search(&SearchRequest::new("nothing"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoResults));
}

#[tokio::test]
async fn results_without_urls_are_no_valid_urls() {
    let server = MockServer::start().await;
    mount_search(&server, json!([{"title": "No link", "content": "x"}])).await;

    let pipeline = pipeline_for(&server).await;
    let err = pipeline
        .search(&SearchRequest::new("nolinks"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoValidUrls));
}

#[tokio::test]
async fn backend_error_status_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&server).await;
    let err = pipeline
        .search(&SearchRequest::new("rust"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::BackendError { status: 502, .. }));
}

#[tokio::test]
async fn extract_single_failing_url_reports_failure() {
    let server = MockServer::start().await;
    let url = format!("{}/missing", server.uri());

    let pipeline = pipeline_for(&server).await;
    let response = pipeline
        .extract(&ExtractRequest::new(vec![url.clone()]))
        .await
        .expect("extract");

    assert!(response.results.is_empty());
    assert_eq!(response.failed_results.len(), 1);
    assert_eq!(response.failed_results[0].url, url);
    assert!(!response.failed_results[0].error.is_empty());
}

#[tokio::test]
async fn extract_mixes_successes_and_failures() {
    let server = MockServer::start().await;
    mount_page(&server, "/ok", page(1)).await;
    let ok = format!("{}/ok", server.uri());
    let bad = format!("{}/bad", server.uri());

    let pipeline = pipeline_for(&server).await;
    let response = pipeline
        .extract(&ExtractRequest::new(vec![ok.clone(), bad.clone()]))
        .await
        .expect("extract");

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].url, ok);
    assert_eq!(response.results[0].raw_content, "Page 1\nBody text 1");
    assert_eq!(response.failed_results[0].url, bad);
}
