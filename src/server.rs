//! Tavily-compatible HTTP server.
//!
//! ## Endpoints
//!
//! - `POST /search`: search, fetch and normalise, return scored results
//! - `POST /extract`: fetch and normalise a list of URLs
//! - `GET /health`: liveness probe
//!
//! Errors are returned as `{"detail": "..."}` with a matching status code.
//! Requests arriving after shutdown has begun get `503`.

use std::net::SocketAddr;
use std::sync::Arc;

use aisearch_pipeline::{
    ExtractRequest, Fetcher, Pipeline, PipelineError, SearchRequest,
};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Result, ServiceError};
use crate::gate::AdmissionGate;

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline<Fetcher>>,
    gate: AdmissionGate,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// An error rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// The request was refused because the service is shutting down.
    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: "service is shutting down".to_owned(),
        }
    }

    /// The request body could not be parsed into the expected shape.
    pub fn malformed(rejection: &JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::NoResults | PipelineError::NoValidUrls => StatusCode::NOT_FOUND,
            PipelineError::BackendUnavailable(_)
            | PipelineError::BackendError { .. }
            | PipelineError::AllFetchesFailed { .. }
            | PipelineError::FetcherInit(_)
            | PipelineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), detail = %self.detail, "request failed");
        } else {
            tracing::warn!(status = self.status.as_u16(), detail = %self.detail, "request rejected");
        }
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// SearchServer
// ---------------------------------------------------------------------------

/// Build the API router.
pub fn router(pipeline: Arc<Pipeline<Fetcher>>, gate: AdmissionGate) -> Router {
    Router::new()
        .route("/search", post(handle_search))
        .route("/extract", post(handle_extract))
        .route("/health", get(handle_health))
        .with_state(AppState { pipeline, gate })
}

/// The running HTTP server.
///
/// Serves in a background tokio task. [`SearchServer::shutdown`] closes the
/// admission gate, waits for in-flight requests, then stops the listener.
pub struct SearchServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
    gate: AdmissionGate,
    stop: CancellationToken,
}

impl SearchServer {
    /// Start the server.
    ///
    /// Binds to [`ServerConfig::bind_addr`] (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bind`] if the TCP listener cannot bind.
    pub async fn start(
        config: &ServerConfig,
        pipeline: Arc<Pipeline<Fetcher>>,
        gate: AdmissionGate,
    ) -> Result<Self> {
        let app = router(pipeline, gate.clone());

        let bind_addr = config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServiceError::Bind(format!("{bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Bind(format!("failed to get local addr: {e}")))?;

        info!("aisearch listening on http://{addr}");

        let stop = CancellationToken::new();
        let stopped = stop.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(stopped.cancelled_owned())
                .await
            {
                tracing::error!("server error: {e}");
            }
        });

        Ok(Self {
            addr,
            handle,
            gate,
            stop,
        })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Close the gate, drain in-flight requests and stop the listener.
    pub async fn shutdown(&mut self) {
        self.gate.begin_shutdown();
        self.gate.wait_drained().await;
        self.stop.cancel();
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                tracing::error!("server task failed: {e}");
            }
        }
        info!("aisearch server stopped");
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn handle_search(
    State(state): State<AppState>,
    body: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    // A closed gate wins over a body rejection.
    let Some(_permit) = state.gate.try_admit() else {
        return ApiError::unavailable().into_response();
    };
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return ApiError::malformed(&rejection).into_response(),
    };
    let span = tracing::info_span!("search", request_id = %Uuid::new_v4());

    async move {
        tracing::trace!(query = %request.query, "search request");
        match state.pipeline.search(&request).await {
            Ok(response) => {
                info!(
                    results = response.results.len(),
                    elapsed = response.response_time,
                    "search complete"
                );
                Json(response).into_response()
            }
            Err(e) => ApiError::from(e).into_response(),
        }
    }
    .instrument(span)
    .await
}

async fn handle_extract(
    State(state): State<AppState>,
    body: std::result::Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    // A closed gate wins over a body rejection.
    let Some(_permit) = state.gate.try_admit() else {
        return ApiError::unavailable().into_response();
    };
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return ApiError::malformed(&rejection).into_response(),
    };
    let span = tracing::info_span!("extract", request_id = %Uuid::new_v4());

    async move {
        match state.pipeline.extract(&request).await {
            Ok(response) => {
                info!(
                    succeeded = response.results.len(),
                    failed = response.failed_results.len(),
                    elapsed = response.response_time,
                    "extract complete"
                );
                Json(response).into_response()
            }
            Err(e) => ApiError::from(e).into_response(),
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_error_taxonomy() {
        let cases = [
            (PipelineError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::NoResults, StatusCode::NOT_FOUND),
            (PipelineError::NoValidUrls, StatusCode::NOT_FOUND),
            (
                PipelineError::BackendUnavailable("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::BackendError {
                    status: 502,
                    body: String::new(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::AllFetchesFailed {
                    failed_urls: vec![],
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn unavailable_is_503() {
        assert_eq!(ApiError::unavailable().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
