//! `/api/latency/*` handlers

use super::{ApiError, ApiResponse, ApiResult, AppState};
use crate::analytics::{
    latency_history, latency_metrics, live_snapshot, ConnectionHistory, ConnectionMetric, HistoryFilter,
    HistoryQuery, LiveConnection,
};
use crate::client::LatencySeries;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

pub(super) async fn live_connections(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<LiveConnection>>>> {
    let live = live_snapshot(&state.db).await?;
    Ok(ApiResponse::ok(live))
}

pub(super) async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ConnectionHistory>>>> {
    let filter = HistoryFilter::try_from(query)?;
    let history = latency_history(&state.db, &filter).await?;
    Ok(ApiResponse::ok(history))
}

pub(super) async fn metrics(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ConnectionMetric>>>> {
    let metrics = latency_metrics(&state.db).await?;
    Ok(ApiResponse::ok(metrics))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpstreamQuery {
    location: Option<String>,
    #[serde(rename = "dateRange")]
    date_range: Option<String>,
}

pub(super) async fn upstream_series(
    State(state): State<AppState>,
    Query(query): Query<UpstreamQuery>,
) -> ApiResult<Json<LatencySeries>> {
    let location = query.location.filter(|v| !v.is_empty());
    let date_range = query.date_range.filter(|v| !v.is_empty());
    let (Some(location), Some(date_range)) = (location, date_range) else {
        return Err(ApiError::with_body(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing location or dateRange" }),
        ));
    };

    match state.radar.latency_series(&location, &date_range).await {
        Ok(series) => Ok(Json(series)),
        Err(e) => {
            error!("Radar request for {} ({}) failed: {}", location, date_range, e);
            Err(ApiError::with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to fetch latency data" }),
            ))
        }
    }
}
