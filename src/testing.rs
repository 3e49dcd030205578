//! Shared fixtures for unit tests

use crate::storage::Database;
use crate::types::{
    CloudRegion, Connection, Coordinates, ExchangeServer, ExchangeStatus, ServerLocation,
};
use chrono::{DateTime, TimeZone, Utc};

pub fn connection(id: &str, exchange: &str, provider: &str, region: &str) -> Connection {
    Connection {
        id: id.to_string(),
        exchange_id: exchange.to_lowercase(),
        exchange_name: exchange.to_string(),
        region_id: id.rsplit('-').next().unwrap_or(id).to_string(),
        region_name: region.to_string(),
        provider: provider.to_string(),
        latency: None,
        quality: None,
        color: None,
        start_lat: 35.68,
        start_lng: 139.69,
        end_lat: 1.35,
        end_lng: 103.82,
    }
}

pub fn exchange(id: &str, name: &str, logo_url: Option<&str>) -> ExchangeServer {
    ExchangeServer {
        exchange_id: id.to_string(),
        exchange_code: id.to_uppercase(),
        exchange_name: name.to_string(),
        base_country: "Japan".to_string(),
        coordinates: Coordinates { lat: 35.68, lng: 139.69 },
        preferred_regions: vec!["ap-northeast-1".to_string()],
        logo_url: logo_url.map(str::to_string),
        provider: Some("AWS".to_string()),
        status: ExchangeStatus::Online,
        last_ping: None,
    }
}

pub fn region(code: &str, provider: &str, name: &str, active: bool) -> CloudRegion {
    CloudRegion {
        provider_id: provider.to_lowercase(),
        provider_name: provider.to_string(),
        location_type: Some("region".to_string()),
        region_name: name.to_string(),
        region_code: code.to_string(),
        country: "Singapore".to_string(),
        city: "Singapore".to_string(),
        coordinates: Coordinates { lat: 1.35, lng: 103.82 },
        alpha2: Some("SG".to_string()),
        is_active: active,
        available_capacity: Some(75.0),
    }
}

pub fn location(id: &str, name: &str) -> ServerLocation {
    ServerLocation {
        location_id: id.to_string(),
        alpha2: "SG".to_string(),
        latitude: "1.35".to_string(),
        longitude: "103.82".to_string(),
        name: name.to_string(),
        region: "Asia".to_string(),
        subregion: "South-eastern Asia".to_string(),
    }
}

/// Fixed base time, offset by `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub async fn memory_db() -> Database {
    Database::in_memory().await.expect("in-memory database")
}
