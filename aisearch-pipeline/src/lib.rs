//! # aisearch-pipeline
//!
//! Search-then-fetch core for a Tavily-compatible search service.
//!
//! A request flows strictly through five stages:
//!
//! 1. [`query`] turns the logical query into a SearXNG form payload.
//! 2. [`searxng`] posts it and returns ranked candidates.
//! 3. [`fetch::orchestrator`] fetches the candidate pages through a
//!    [`fetch::PageFetcher`] in two rounds with at most one retry.
//! 4. [`normalize`] converts the fetched markdown into plain text.
//! 5. [`assemble`] scores candidates and builds the response body.
//!
//! [`Pipeline`] wires the stages together and is shared across requests.
//! It carries no HTTP listener; the service crate owns the transport.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod searxng;
pub mod types;

pub use config::{FetchConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use fetch::{Crawl4AiFetcher, Fetcher, FetcherHandle, HttpFetcher, PageFetcher};
pub use pipeline::Pipeline;
pub use types::{
    AggregatedResponse, ExtractRequest, ExtractResponse, ExtractResult, FailedResult,
    ScoredResult, SearchRequest, Topic,
};
