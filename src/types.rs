//! Core domain types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Categorical latency bucket.
///
/// The generator labels ticks `Good`/`Average`/`Poor`; the seeding utility
/// uses the finer `Excellent`/`Good`/`Fair`/`Poor` scale. `Unknown` marks a
/// connection with no samples yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Excellent,
    Good,
    Average,
    Fair,
    Poor,
    Unknown,
}

impl Quality {
    /// Label used by the periodic generator
    pub fn from_tick_latency(latency: u32) -> Self {
        if latency < 50 {
            Quality::Good
        } else if latency < 100 {
            Quality::Average
        } else {
            Quality::Poor
        }
    }

    /// Label and arc color used when seeding connections
    pub fn from_seed_latency(latency: u32) -> (Self, &'static str) {
        if latency < 30 {
            (Quality::Excellent, "green")
        } else if latency < 60 {
            (Quality::Good, "yellow")
        } else if latency < 100 {
            (Quality::Fair, "orange")
        } else {
            (Quality::Poor, "red")
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Excellent => "Excellent",
            Quality::Good => "Good",
            Quality::Average => "Average",
            Quality::Fair => "Fair",
            Quality::Poor => "Poor",
            Quality::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Excellent" => Ok(Quality::Excellent),
            "Good" => Ok(Quality::Good),
            "Average" => Ok(Quality::Average),
            "Fair" => Ok(Quality::Fair),
            "Poor" => Ok(Quality::Poor),
            "Unknown" => Ok(Quality::Unknown),
            other => Err(format!("unknown quality label: {}", other)),
        }
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A monitored exchange → cloud region pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub exchange_id: String,
    pub exchange_name: String,
    pub region_id: String,
    pub region_name: String,
    pub provider: String,
    /// Current latency in whole milliseconds
    pub latency: Option<u32>,
    pub quality: Option<Quality>,
    pub color: Option<String>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
}

/// One immutable latency observation for a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub id: i64,
    pub connection_id: String,
    pub latency: u32,
    pub quality: Option<Quality>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    #[default]
    Online,
    Offline,
    Maintenance,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Online => "online",
            ExchangeStatus::Offline => "offline",
            ExchangeStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for ExchangeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(ExchangeStatus::Online),
            "offline" => Ok(ExchangeStatus::Offline),
            "maintenance" => Ok(ExchangeStatus::Maintenance),
            other => Err(format!("unknown exchange status: {}", other)),
        }
    }
}

/// Exchange server reference record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeServer {
    pub exchange_id: String,
    pub exchange_code: String,
    pub exchange_name: String,
    pub base_country: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub preferred_regions: Vec<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub status: ExchangeStatus,
    #[serde(default)]
    pub last_ping: Option<DateTime<Utc>>,
}

/// Cloud provider region reference record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudRegion {
    pub provider_id: String,
    pub provider_name: String,
    #[serde(default)]
    pub location_type: Option<String>,
    pub region_name: String,
    pub region_code: String,
    pub country: String,
    pub city: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub alpha2: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub available_capacity: Option<f64>,
}

fn default_active() -> bool {
    true
}

/// Country-level server location reference record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLocation {
    pub location_id: String,
    pub alpha2: String,
    pub latitude: String,
    pub longitude: String,
    pub name: String,
    pub region: String,
    pub subregion: String,
}

/// Bundle of reference data loaded by `import`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub exchanges: Vec<ExchangeServer>,
    #[serde(default)]
    pub providers: Vec<CloudRegion>,
    #[serde(default)]
    pub locations: Vec<ServerLocation>,
}

impl ReferenceData {
    /// Read a reference bundle from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// ISO-8601 key with millisecond precision, e.g. `2025-01-01T00:00:05.000Z`
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
