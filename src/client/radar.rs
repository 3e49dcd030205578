//! Cloudflare Radar client for internet latency time series
//!
//! Queries the IQI `LATENCY` metric for a location and date range and
//! flattens the first series into `{timestamp, p50}` points.

use crate::config::RadarConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One point of an upstream latency series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyPoint {
    pub timestamp: String,
    /// Median latency as reported upstream (usually a numeric string)
    pub p50: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySeries {
    pub data: Vec<LatencyPoint>,
}

/// Source of upstream latency series
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RadarApi: Send + Sync {
    async fn latency_series(&self, location: &str, date_range: &str) -> Result<LatencySeries>;
}

#[derive(Debug, Deserialize)]
struct RadarEnvelope {
    result: Option<RadarResult>,
}

#[derive(Debug, Deserialize)]
struct RadarResult {
    serie_0: Option<RadarSerie>,
}

#[derive(Debug, Default, Deserialize)]
struct RadarSerie {
    #[serde(default)]
    timestamps: Vec<String>,
    #[serde(default)]
    p50: Vec<serde_json::Value>,
}

/// Flatten a raw radar response; a missing series yields no points
fn parse_series(body: serde_json::Value) -> Result<LatencySeries> {
    let envelope: RadarEnvelope = serde_json::from_value(body)?;
    let serie = envelope
        .result
        .and_then(|r| r.serie_0)
        .unwrap_or_default();

    let data = serie
        .timestamps
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| LatencyPoint {
            timestamp,
            p50: serie.p50.get(i).cloned().unwrap_or(serde_json::Value::Null),
        })
        .collect();

    Ok(LatencySeries { data })
}

/// HTTP client for the Radar API
#[derive(Clone)]
pub struct RadarClient {
    http: Client,
    base_url: String,
    api_token: String,
}

impl RadarClient {
    pub fn new(config: &RadarConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl RadarApi for RadarClient {
    async fn latency_series(&self, location: &str, date_range: &str) -> Result<LatencySeries> {
        if self.api_token.is_empty() {
            return Err(MonitorError::Upstream("radar API token is not configured".to_string()));
        }

        let body: serde_json::Value = self
            .http
            .get(&self.base_url)
            .bearer_auth(&self.api_token)
            .query(&[
                ("metric", "LATENCY"),
                ("location", location),
                ("dateRange", date_range),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let series = parse_series(body)?;
        debug!("Radar returned {} points for {} ({})", series.data.len(), location, date_range);
        Ok(series)
    }
}
