//! Raw table rows and their conversion into domain types

use crate::types::{
    CloudRegion, Connection, Coordinates, ExchangeServer, LatencySample, ServerLocation,
};
use chrono::{DateTime, Utc};

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ConnectionRow {
    id: String,
    exchange_id: String,
    exchange_name: String,
    region_id: String,
    region_name: String,
    provider: String,
    latency: Option<u32>,
    quality: Option<String>,
    color: Option<String>,
    start_lat: f64,
    start_lng: f64,
    end_lat: f64,
    end_lng: f64,
}

impl From<ConnectionRow> for Connection {
    fn from(row: ConnectionRow) -> Self {
        Self {
            id: row.id,
            exchange_id: row.exchange_id,
            exchange_name: row.exchange_name,
            region_id: row.region_id,
            region_name: row.region_name,
            provider: row.provider,
            latency: row.latency,
            quality: row.quality.and_then(|q| q.parse().ok()),
            color: row.color,
            start_lat: row.start_lat,
            start_lng: row.start_lng,
            end_lat: row.end_lat,
            end_lng: row.end_lng,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SampleRow {
    id: i64,
    connection_id: String,
    latency: u32,
    quality: Option<String>,
    timestamp_ms: i64,
}

impl From<SampleRow> for LatencySample {
    fn from(row: SampleRow) -> Self {
        Self {
            id: row.id,
            connection_id: row.connection_id,
            latency: row.latency,
            quality: row.quality.and_then(|q| q.parse().ok()),
            timestamp: from_millis(row.timestamp_ms),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ExchangeRow {
    exchange_id: String,
    exchange_code: String,
    exchange_name: String,
    base_country: String,
    lat: f64,
    lng: f64,
    preferred_regions: String,
    logo_url: Option<String>,
    provider: Option<String>,
    status: String,
    last_ping_ms: Option<i64>,
}

impl From<ExchangeRow> for ExchangeServer {
    fn from(row: ExchangeRow) -> Self {
        Self {
            exchange_id: row.exchange_id,
            exchange_code: row.exchange_code,
            exchange_name: row.exchange_name,
            base_country: row.base_country,
            coordinates: Coordinates { lat: row.lat, lng: row.lng },
            preferred_regions: serde_json::from_str(&row.preferred_regions).unwrap_or_default(),
            logo_url: row.logo_url,
            provider: row.provider,
            status: row.status.parse().unwrap_or_default(),
            last_ping: row.last_ping_ms.map(from_millis),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CloudRegionRow {
    region_code: String,
    provider_id: String,
    provider_name: String,
    location_type: Option<String>,
    region_name: String,
    country: String,
    city: String,
    lat: f64,
    lng: f64,
    alpha2: Option<String>,
    is_active: bool,
    available_capacity: Option<f64>,
}

impl From<CloudRegionRow> for CloudRegion {
    fn from(row: CloudRegionRow) -> Self {
        Self {
            provider_id: row.provider_id,
            provider_name: row.provider_name,
            location_type: row.location_type,
            region_name: row.region_name,
            region_code: row.region_code,
            country: row.country,
            city: row.city,
            coordinates: Coordinates { lat: row.lat, lng: row.lng },
            alpha2: row.alpha2,
            is_active: row.is_active,
            available_capacity: row.available_capacity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ServerLocationRow {
    location_id: String,
    alpha2: String,
    latitude: String,
    longitude: String,
    name: String,
    region: String,
    subregion: String,
}

impl From<ServerLocationRow> for ServerLocation {
    fn from(row: ServerLocationRow) -> Self {
        Self {
            location_id: row.location_id,
            alpha2: row.alpha2,
            latitude: row.latitude,
            longitude: row.longitude,
            name: row.name,
            region: row.region,
            subregion: row.subregion,
        }
    }
}
