//! Latency history view

use crate::error::{MonitorError, Result};
use crate::storage::{Database, LatencyRange};
use crate::types::{iso_timestamp, Connection, LatencySample};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw query parameters; empty strings count as absent
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub exchange_name: Option<String>,
    pub provider: Option<String>,
    pub region_name: Option<String>,
    pub min_latency: Option<String>,
    pub max_latency: Option<String>,
}

/// Validated history filter.
///
/// Exchange and provider match case-insensitively on the whole value, the
/// region name case-insensitively as a substring. Values are literal text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub exchange_name: Option<String>,
    pub provider: Option<String>,
    pub region_name: Option<String>,
    pub range: LatencyRange,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bound(name: &str, value: Option<String>) -> Result<Option<f64>> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| MonitorError::InvalidRequest(format!("{} must be a number, got '{}'", name, raw))),
    }
}

impl TryFrom<HistoryQuery> for HistoryFilter {
    type Error = MonitorError;

    fn try_from(query: HistoryQuery) -> Result<Self> {
        let range = LatencyRange {
            min: parse_bound("minLatency", query.min_latency)?,
            max: parse_bound("maxLatency", query.max_latency)?,
        };

        Ok(Self {
            exchange_name: non_empty(query.exchange_name).map(|v| v.to_lowercase()),
            provider: non_empty(query.provider).map(|v| v.to_lowercase()),
            region_name: non_empty(query.region_name).map(|v| v.to_lowercase()),
            range,
        })
    }
}

impl HistoryFilter {
    /// Whether a connection passes the name filters
    pub fn matches(&self, conn: &Connection) -> bool {
        let exact = |wanted: &Option<String>, actual: &str| {
            wanted.as_ref().map_or(true, |w| actual.to_lowercase() == *w)
        };

        exact(&self.exchange_name, &conn.exchange_name)
            && exact(&self.provider, &conn.provider)
            && self
                .region_name
                .as_ref()
                .map_or(true, |r| conn.region_name.to_lowercase().contains(r.as_str()))
    }
}

/// Time series for one connection, keyed by ISO timestamp (ascending)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHistory {
    pub id: String,
    pub exchange_name: String,
    pub provider: String,
    pub region_name: String,
    pub latency_history: BTreeMap<String, u32>,
}

/// Group samples under their connections.
///
/// Samples must be in ascending time order; a repeated timestamp keeps the
/// later sample.
pub fn build_history(connections: &[Connection], samples: Vec<LatencySample>) -> Vec<ConnectionHistory> {
    let mut by_connection: HashMap<String, BTreeMap<String, u32>> = HashMap::new();
    for sample in samples {
        by_connection
            .entry(sample.connection_id)
            .or_default()
            .insert(iso_timestamp(&sample.timestamp), sample.latency);
    }

    connections
        .iter()
        .map(|conn| ConnectionHistory {
            id: conn.id.clone(),
            exchange_name: conn.exchange_name.clone(),
            provider: conn.provider.clone(),
            region_name: conn.region_name.clone(),
            latency_history: by_connection.remove(&conn.id).unwrap_or_default(),
        })
        .collect()
}

/// History for every connection passing `filter`
pub async fn latency_history(db: &Database, filter: &HistoryFilter) -> Result<Vec<ConnectionHistory>> {
    let connections: Vec<Connection> = db
        .list_connections()
        .await?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();

    let ids: Vec<String> = connections.iter().map(|c| c.id.clone()).collect();
    let samples = db.samples_for_connections(&ids, filter.range).await?;

    tracing::debug!(
        "History query matched {} connections, {} samples",
        connections.len(),
        samples.len()
    );

    Ok(build_history(&connections, samples))
}
