//! Reference data, overview counters and globe locations

use super::{ApiResponse, ApiResult, AppState};
use crate::analytics::{self, LocationBundle, OverviewMetrics};
use crate::types::{CloudRegion, ExchangeServer, ServerLocation};
use axum::{extract::State, response::Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ExchangeSummary {
    exchange_id: String,
    exchange_name: String,
    base_country: String,
    exchange_code: String,
    logo_url: Option<String>,
}

impl From<ExchangeServer> for ExchangeSummary {
    fn from(e: ExchangeServer) -> Self {
        Self {
            exchange_id: e.exchange_id,
            exchange_name: e.exchange_name,
            base_country: e.base_country,
            exchange_code: e.exchange_code,
            logo_url: e.logo_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProviderSummary {
    provider_id: String,
    provider_name: String,
    region_name: String,
    region_code: String,
    country: String,
}

impl From<CloudRegion> for ProviderSummary {
    fn from(r: CloudRegion) -> Self {
        Self {
            provider_id: r.provider_id,
            provider_name: r.provider_name,
            region_name: r.region_name,
            region_code: r.region_code,
            country: r.country,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegionSummary {
    location_id: String,
    name: String,
    alpha2: String,
    region: String,
    subregion: String,
}

impl From<ServerLocation> for RegionSummary {
    fn from(l: ServerLocation) -> Self {
        Self {
            location_id: l.location_id,
            name: l.name,
            alpha2: l.alpha2,
            region: l.region,
            subregion: l.subregion,
        }
    }
}

pub(super) async fn exchanges(State(state): State<AppState>) -> ApiResult<Json<Vec<ExchangeSummary>>> {
    let exchanges = state.db.list_exchanges().await?;
    Ok(Json(exchanges.into_iter().map(Into::into).collect()))
}

/// Active cloud regions only
pub(super) async fn providers(State(state): State<AppState>) -> ApiResult<Json<Vec<ProviderSummary>>> {
    let regions = state.db.list_cloud_regions(true).await?;
    Ok(Json(regions.into_iter().map(Into::into).collect()))
}

pub(super) async fn regions(State(state): State<AppState>) -> ApiResult<Json<Vec<RegionSummary>>> {
    let locations = state.db.list_server_locations().await?;
    Ok(Json(locations.into_iter().map(Into::into).collect()))
}

pub(super) async fn overview(State(state): State<AppState>) -> ApiResult<Json<OverviewMetrics>> {
    Ok(Json(analytics::overview_metrics(&state.db).await?))
}

pub(super) async fn locations(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<LocationBundle>>> {
    let bundle = analytics::locations(&state.db).await?;
    Ok(ApiResponse::ok(bundle))
}
