//! HTTP API for the dashboard frontend
//!
//! ```text
//! /api/health
//! /api/latency/{latency, latencyhistory, latencymetric, latencylive}
//! /api/data/{exchanges, providers, regions}
//! /api/metrics
//! /api/locations/locations
//! ```

mod cors;
mod latency;
mod reference;

#[cfg(test)]
mod tests;

use crate::client::RadarApi;
use crate::error::{MonitorError, Result};
use crate::simulator::{SharedStatus, UpdaterStatus};
use crate::storage::Database;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub radar: Arc<dyn RadarApi>,
    pub updater: SharedStatus,
}

impl AppState {
    pub fn new(db: Database, radar: Arc<dyn RadarApi>, updater: SharedStatus) -> Self {
        Self { db, radar, updater }
    }
}

/// `{success: true, data}` envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

/// Error response with an arbitrary JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    pub fn with_body(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// 500 with the generic message; the cause is only logged
    pub fn internal(err: impl std::fmt::Display) -> Self {
        error!("Request failed: {}", err);
        Self::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "message": "Internal Server Error" }),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_body(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "message": message.into() }),
        )
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    updater: UpdaterStatus,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let updater = state.updater.read().clone();
    Json(Health { status: "OK", updater })
}

/// Build the full router with CORS for `client_url`
pub fn create_router(state: AppState, client_url: &str) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/latency/latency", get(latency::live_connections))
        .route("/api/latency/latencyhistory", get(latency::history))
        .route("/api/latency/latencymetric", get(latency::metrics))
        .route("/api/latency/latencylive", get(latency::upstream_series))
        .route("/api/data/exchanges", get(reference::exchanges))
        .route("/api/data/providers", get(reference::providers))
        .route("/api/data/regions", get(reference::regions))
        .route("/api/metrics", get(reference::overview))
        .route("/api/locations/locations", get(reference::locations))
        .with_state(state)
        .layer(middleware::from_fn_with_state(cors::origin(client_url), cors::cors))
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve<F>(listener: TcpListener, state: AppState, client_url: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, client_url);
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("API server stopped");
    Ok(())
}
