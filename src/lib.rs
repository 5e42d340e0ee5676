//! aisearch: a Tavily-compatible search service.
//!
//! Wraps the [`aisearch_pipeline`] core in an HTTP surface with a request
//! admission gate and graceful shutdown. The `aisearch` binary loads
//! [`config::ServiceConfig`], starts the page fetcher and serves
//! `POST /search`, `POST /extract` and `GET /health`.

pub mod config;
pub mod error;
pub mod gate;
pub mod server;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use gate::{AdmissionGate, RequestPermit};
pub use server::SearchServer;
