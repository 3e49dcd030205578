//! Per-connection latency metrics

use crate::error::Result;
use crate::storage::{Database, SampleAggregate};
use crate::types::{Connection, ExchangeServer};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;

/// Logo used when the exchange has none
pub const PLACEHOLDER_LOGO: &str = "https://via.placeholder.com/40";

/// Reliability is not measured yet; every connection reports this value
pub const RELIABILITY_PLACEHOLDER: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetric {
    pub id: String,
    pub exchange: String,
    pub provider: String,
    pub region: String,
    pub logo: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_latency: Decimal,
    pub peak_latency: u32,
    pub reliability: u32,
    pub data_points: i64,
}

/// `total / count` rounded half away from zero to 2 places; zero when `count == 0`
pub fn mean_2dp(total: i64, count: i64) -> Decimal {
    if count <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(total) / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Combine connections with their sample aggregates and exchange logos
pub fn build_metrics(
    connections: &[Connection],
    aggregates: &HashMap<String, SampleAggregate>,
    exchanges: &[ExchangeServer],
) -> Vec<ConnectionMetric> {
    let logos: HashMap<&str, &str> = exchanges
        .iter()
        .filter_map(|e| {
            e.logo_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| (e.exchange_name.as_str(), url))
        })
        .collect();

    connections
        .iter()
        .map(|conn| {
            let agg = aggregates.get(&conn.id).copied().unwrap_or_default();
            ConnectionMetric {
                id: conn.id.clone(),
                exchange: conn.exchange_name.clone(),
                provider: conn.provider.clone(),
                region: conn.region_name.clone(),
                logo: logos
                    .get(conn.exchange_name.as_str())
                    .copied()
                    .unwrap_or(PLACEHOLDER_LOGO)
                    .to_string(),
                avg_latency: mean_2dp(agg.total, agg.data_points),
                peak_latency: if agg.data_points > 0 { agg.peak } else { 0 },
                reliability: RELIABILITY_PLACEHOLDER,
                data_points: agg.data_points,
            }
        })
        .collect()
}

/// Metrics for every connection over its full sample log
pub async fn latency_metrics(db: &Database) -> Result<Vec<ConnectionMetric>> {
    let connections = db.list_connections().await?;
    let aggregates = db.sample_aggregates().await?;
    let exchanges = db.list_exchanges().await?;

    Ok(build_metrics(&connections, &aggregates, &exchanges))
}
