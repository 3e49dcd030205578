//! Configuration management
//!
//! Settings come from an optional TOML file, then `LATENCY_MONITOR__*`
//! environment variables, then the legacy plain variables the dashboard
//! deployment already sets (`DATABASE_URL`, `PORT`, `CLIENT_URL`, `CF_API_TOKEN`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Cloudflare Radar IQI time-series endpoint
pub const DEFAULT_RADAR_URL: &str =
    "https://api.cloudflare.com/client/v4/radar/quality/iqi/timeseries_groups";

/// Exclusive ceiling for generated tick latency (ms)
pub const MAX_TICK_LATENCY_MS: u32 = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub updater: UpdaterConfig,
    #[serde(default)]
    pub radar: RadarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed by CORS (the dashboard frontend)
    #[serde(default = "default_client_url")]
    pub client_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Exclusive upper bound of simulated latency (ms), capped at
    /// `MAX_TICK_LATENCY_MS`
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u32,
    /// Samples older than this are pruned after each tick; 0 keeps everything
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarConfig {
    #[serde(default = "default_radar_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_radar_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_client_url() -> String {
    "http://localhost:4028".to_string()
}
fn default_database_url() -> String {
    "sqlite://data/latency_monitor.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_interval_secs() -> u64 {
    5
}
fn default_max_latency_ms() -> u32 {
    MAX_TICK_LATENCY_MS
}
fn default_retention_hours() -> u64 {
    24
}
fn default_radar_url() -> String {
    DEFAULT_RADAR_URL.to_string()
}
fn default_radar_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_url: default_client_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            max_latency_ms: default_max_latency_ms(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            api_url: default_radar_url(),
            api_token: String::new(),
            timeout_secs: default_radar_timeout_secs(),
        }
    }
}

impl UpdaterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Effective generator bound: `max_latency_ms` clamped to `1..=MAX_TICK_LATENCY_MS`
    pub fn latency_ceiling(&self) -> u32 {
        self.max_latency_ms.clamp(1, MAX_TICK_LATENCY_MS)
    }

    /// Retention window, `None` when pruning is disabled
    pub fn retention(&self) -> Option<chrono::Duration> {
        if self.retention_hours == 0 {
            None
        } else {
            i64::try_from(self.retention_hours)
                .ok()
                .and_then(chrono::Duration::try_hours)
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("LATENCY_MONITOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply the plain environment variables used by existing deployments
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = url;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(origin) = lookup("CLIENT_URL").filter(|v| !v.is_empty()) {
            self.server.client_url = origin;
        }
        if let Some(token) = lookup("CF_API_TOKEN") {
            self.radar.api_token = token;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
