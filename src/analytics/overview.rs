//! Dashboard overview counters and the location bundle for the globe view

use super::metrics::mean_2dp;
use crate::error::Result;
use crate::storage::Database;
use crate::types::{CloudRegion, Connection, ExchangeServer, ExchangeStatus, Quality};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Provider marker image used on the globe
pub const PROVIDER_LOGO: &str =
    "https://images.unsplash.com/photo-1451187580459-43490279c0fa?w=100&h=100&fit=crop&crop=center";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub average_latency: Decimal,
    pub active_exchanges: i64,
    pub cloud_regions: i64,
    pub server_locations: i64,
    /// Share of rated connections not currently `Poor`, in percent
    #[serde(with = "rust_decimal::serde::float")]
    pub system_health: Decimal,
}

fn current_latency_mean<'a>(connections: impl Iterator<Item = &'a Connection>) -> (i64, i64) {
    connections
        .filter_map(|c| c.latency)
        .fold((0, 0), |(total, n), latency| (total + i64::from(latency), n + 1))
}

fn system_health(connections: &[Connection]) -> Decimal {
    let rated: Vec<Quality> = connections
        .iter()
        .filter_map(|c| c.quality)
        .filter(|q| *q != Quality::Unknown)
        .collect();

    if rated.is_empty() {
        return Decimal::ONE_HUNDRED;
    }
    let healthy = rated.iter().filter(|q| **q != Quality::Poor).count();
    mean_2dp(healthy as i64 * 100, rated.len() as i64)
}

pub async fn overview_metrics(db: &Database) -> Result<OverviewMetrics> {
    let connections = db.list_connections().await?;
    let (total, count) = current_latency_mean(connections.iter());

    Ok(OverviewMetrics {
        average_latency: mean_2dp(total, count),
        active_exchanges: db.count_exchanges().await?,
        cloud_regions: db.count_active_regions().await?,
        server_locations: db.count_server_locations().await?,
        system_health: system_health(&connections),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeLocation {
    pub id: String,
    pub name: String,
    pub code: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub logo: Option<String>,
    /// Mean current latency over this exchange's connections
    #[serde(with = "rust_decimal::serde::float_option")]
    pub latency: Option<Decimal>,
    pub provider: Option<String>,
    pub status: ExchangeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLocation {
    pub id: String,
    pub name: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub logo: &'static str,
    pub provider: String,
    pub region: String,
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBundle {
    pub exchanges: Vec<ExchangeLocation>,
    pub providers: Vec<ProviderLocation>,
    pub conn: Vec<Connection>,
    pub connected_exchanges: Vec<ExchangeLocation>,
    pub connected_cloud_regions: Vec<ProviderLocation>,
}

fn exchange_location(exchange: &ExchangeServer, connections: &[&Connection]) -> ExchangeLocation {
    let (total, count) = current_latency_mean(connections.iter().copied());

    ExchangeLocation {
        id: exchange.exchange_id.clone(),
        name: exchange.exchange_name.clone(),
        code: exchange.base_country.clone(),
        location: exchange.base_country.clone(),
        lat: exchange.coordinates.lat,
        lng: exchange.coordinates.lng,
        logo: exchange.logo_url.clone(),
        latency: (count > 0).then(|| mean_2dp(total, count)),
        provider: exchange
            .provider
            .clone()
            .or_else(|| connections.first().map(|c| c.provider.clone())),
        status: exchange.status,
    }
}

fn provider_location(region: &CloudRegion) -> ProviderLocation {
    ProviderLocation {
        id: region.region_code.clone(),
        name: region.region_name.clone(),
        location: format!("{}, {}", region.city, region.country),
        lat: region.coordinates.lat,
        lng: region.coordinates.lng,
        code: region.alpha2.clone(),
        kind: "provider",
        logo: PROVIDER_LOGO,
        provider: region.provider_name.to_lowercase(),
        region: region.region_name.clone(),
        capacity: region.available_capacity,
    }
}

/// Assemble exchanges, active regions and connections for the globe.
///
/// `connected_*` keep the order in which connections first reference them;
/// ids with no matching record are dropped.
pub fn build_locations(
    exchanges: &[ExchangeServer],
    regions: &[CloudRegion],
    connections: Vec<Connection>,
) -> LocationBundle {
    let (exchange_locations, provider_locations, connected_exchanges, connected_cloud_regions) = {
        let mut by_exchange: HashMap<&str, Vec<&Connection>> = HashMap::new();
        for conn in &connections {
            by_exchange.entry(conn.exchange_id.as_str()).or_default().push(conn);
        }

        let exchange_locations: Vec<ExchangeLocation> = exchanges
            .iter()
            .map(|e| {
                let conns = by_exchange.get(e.exchange_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                exchange_location(e, conns)
            })
            .collect();
        let provider_locations: Vec<ProviderLocation> = regions.iter().map(provider_location).collect();

        let mut seen = HashSet::new();
        let connected_exchanges: Vec<ExchangeLocation> = connections
            .iter()
            .filter(|c| seen.insert(c.exchange_id.as_str()))
            .filter_map(|c| exchange_locations.iter().find(|e| e.id == c.exchange_id).cloned())
            .collect();

        let mut seen = HashSet::new();
        let connected_cloud_regions: Vec<ProviderLocation> = connections
            .iter()
            .filter(|c| seen.insert(c.region_id.as_str()))
            .filter_map(|c| provider_locations.iter().find(|p| p.id == c.region_id).cloned())
            .collect();

        (exchange_locations, provider_locations, connected_exchanges, connected_cloud_regions)
    };

    LocationBundle {
        exchanges: exchange_locations,
        providers: provider_locations,
        conn: connections,
        connected_exchanges,
        connected_cloud_regions,
    }
}

pub async fn locations(db: &Database) -> Result<LocationBundle> {
    let exchanges = db.list_exchanges().await?;
    let regions = db.list_cloud_regions(true).await?;
    let connections = db.list_connections().await?;

    Ok(build_locations(&exchanges, &regions, connections))
}
