//! Live latency snapshot: latest sample per connection

use crate::error::Result;
use crate::storage::Database;
use crate::types::{Connection, LatencySample, Quality};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConnection {
    pub id: String,
    pub exchange_id: String,
    pub exchange_name: String,
    pub region_id: String,
    pub region_name: String,
    pub provider: String,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub latency: Option<u32>,
    pub quality: Quality,
}

/// Left join of connections against their latest samples.
///
/// Connections without a sample keep a null latency and `Unknown` quality.
pub fn merge_latest(
    connections: Vec<Connection>,
    latest: &HashMap<String, LatencySample>,
) -> Vec<LiveConnection> {
    connections
        .into_iter()
        .map(|conn| {
            let sample = latest.get(&conn.id);
            LiveConnection {
                latency: sample.map(|s| s.latency),
                quality: sample.and_then(|s| s.quality).unwrap_or(Quality::Unknown),
                id: conn.id,
                exchange_id: conn.exchange_id,
                exchange_name: conn.exchange_name,
                region_id: conn.region_id,
                region_name: conn.region_name,
                provider: conn.provider,
                start_lat: conn.start_lat,
                start_lng: conn.start_lng,
                end_lat: conn.end_lat,
                end_lng: conn.end_lng,
            }
        })
        .collect()
}

pub async fn live_snapshot(db: &Database) -> Result<Vec<LiveConnection>> {
    let connections = db.list_connections().await?;
    let latest = db.latest_samples().await?;
    Ok(merge_latest(connections, &latest))
}
