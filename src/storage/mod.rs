//! SQLite persistence
//!
//! Holds the reference tables (exchanges, cloud regions, server locations),
//! the connection table and the append-only latency sample log.

mod rows;


use crate::error::{MonitorError, Result};
use crate::types::{
    CloudRegion, Connection, ExchangeServer, LatencySample, Quality, ReferenceData, ServerLocation,
};
use chrono::{DateTime, Utc};
use rows::{CloudRegionRow, ConnectionRow, ExchangeRow, SampleRow, ServerLocationRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS exchanges (
    exchange_id TEXT PRIMARY KEY,
    exchange_code TEXT NOT NULL UNIQUE,
    exchange_name TEXT NOT NULL,
    base_country TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    preferred_regions TEXT NOT NULL DEFAULT '[]',
    logo_url TEXT,
    provider TEXT,
    status TEXT NOT NULL DEFAULT 'online',
    last_ping_ms INTEGER
);

CREATE TABLE IF NOT EXISTS cloud_regions (
    region_code TEXT PRIMARY KEY,
    provider_id TEXT NOT NULL,
    provider_name TEXT NOT NULL,
    location_type TEXT,
    region_name TEXT NOT NULL,
    country TEXT NOT NULL,
    city TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    alpha2 TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    available_capacity REAL
);

CREATE TABLE IF NOT EXISTS server_locations (
    location_id TEXT PRIMARY KEY,
    alpha2 TEXT NOT NULL,
    latitude TEXT NOT NULL,
    longitude TEXT NOT NULL,
    name TEXT NOT NULL,
    region TEXT NOT NULL,
    subregion TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS connections (
    id TEXT PRIMARY KEY,
    exchange_id TEXT NOT NULL,
    exchange_name TEXT NOT NULL,
    region_id TEXT NOT NULL,
    region_name TEXT NOT NULL,
    provider TEXT NOT NULL,
    latency INTEGER,
    quality TEXT,
    color TEXT,
    start_lat REAL NOT NULL,
    start_lng REAL NOT NULL,
    end_lat REAL NOT NULL,
    end_lng REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS latency_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    connection_id TEXT NOT NULL,
    latency INTEGER NOT NULL,
    quality TEXT,
    timestamp_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_samples_connection_ts
    ON latency_samples (connection_id, timestamp_ms);
CREATE INDEX IF NOT EXISTS idx_samples_ts
    ON latency_samples (timestamp_ms);
"#;

/// Per-connection aggregate over the sample log
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleAggregate {
    pub data_points: i64,
    pub total: i64,
    pub peak: u32,
}

/// Sample-range filter for history queries (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencyRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Row counts written by a reference-data import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub exchanges: usize,
    pub providers: usize,
    pub locations: usize,
}

/// Database handle, cheap to clone
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database at `url`, creating the file and schema if needed
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, 5).await
    }

    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        tracing::info!("Database connected: {}", url);
        Ok(db)
    }

    /// Private in-memory database; a single pooled connection keeps it alive
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========== Reference data ==========

    /// Upsert exchanges, cloud regions and server locations in one transaction
    pub async fn import_reference(&self, data: &ReferenceData) -> Result<ImportSummary> {
        let mut tx = self.pool.begin().await?;

        for exchange in &data.exchanges {
            upsert_exchange(&mut *tx, exchange).await?;
        }
        for region in &data.providers {
            upsert_cloud_region(&mut *tx, region).await?;
        }
        for location in &data.locations {
            upsert_server_location(&mut *tx, location).await?;
        }

        tx.commit().await?;

        Ok(ImportSummary {
            exchanges: data.exchanges.len(),
            providers: data.providers.len(),
            locations: data.locations.len(),
        })
    }

    pub async fn upsert_exchange(&self, exchange: &ExchangeServer) -> Result<()> {
        upsert_exchange(&self.pool, exchange).await
    }

    pub async fn upsert_cloud_region(&self, region: &CloudRegion) -> Result<()> {
        upsert_cloud_region(&self.pool, region).await
    }

    pub async fn upsert_server_location(&self, location: &ServerLocation) -> Result<()> {
        upsert_server_location(&self.pool, location).await
    }

    pub async fn list_exchanges(&self) -> Result<Vec<ExchangeServer>> {
        let rows: Vec<ExchangeRow> = sqlx::query_as(
            "SELECT exchange_id, exchange_code, exchange_name, base_country, lat, lng, \
             preferred_regions, logo_url, provider, status, last_ping_ms \
             FROM exchanges ORDER BY exchange_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ExchangeServer::from).collect())
    }

    pub async fn list_cloud_regions(&self, active_only: bool) -> Result<Vec<CloudRegion>> {
        let sql = if active_only {
            "SELECT region_code, provider_id, provider_name, location_type, region_name, country, \
             city, lat, lng, alpha2, is_active, available_capacity \
             FROM cloud_regions WHERE is_active = 1 ORDER BY provider_name, region_code"
        } else {
            "SELECT region_code, provider_id, provider_name, location_type, region_name, country, \
             city, lat, lng, alpha2, is_active, available_capacity \
             FROM cloud_regions ORDER BY provider_name, region_code"
        };
        let rows: Vec<CloudRegionRow> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(CloudRegion::from).collect())
    }

    pub async fn list_server_locations(&self) -> Result<Vec<ServerLocation>> {
        let rows: Vec<ServerLocationRow> = sqlx::query_as(
            "SELECT location_id, alpha2, latitude, longitude, name, region, subregion \
             FROM server_locations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ServerLocation::from).collect())
    }

    pub async fn count_exchanges(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exchanges")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_active_regions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cloud_regions WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_server_locations(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM server_locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ========== Connections ==========

    pub async fn upsert_connection(&self, conn: &Connection) -> Result<()> {
        sqlx::query(
            "INSERT INTO connections (id, exchange_id, exchange_name, region_id, region_name, \
             provider, latency, quality, color, start_lat, start_lng, end_lat, end_lng) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             exchange_id = excluded.exchange_id, exchange_name = excluded.exchange_name, \
             region_id = excluded.region_id, region_name = excluded.region_name, \
             provider = excluded.provider, latency = excluded.latency, \
             quality = excluded.quality, color = excluded.color, \
             start_lat = excluded.start_lat, start_lng = excluded.start_lng, \
             end_lat = excluded.end_lat, end_lng = excluded.end_lng",
        )
        .bind(&conn.id)
        .bind(&conn.exchange_id)
        .bind(&conn.exchange_name)
        .bind(&conn.region_id)
        .bind(&conn.region_name)
        .bind(&conn.provider)
        .bind(conn.latency)
        .bind(conn.quality.map(|q| q.as_str()))
        .bind(&conn.color)
        .bind(conn.start_lat)
        .bind(conn.start_lng)
        .bind(conn.end_lat)
        .bind(conn.end_lng)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        let rows: Vec<ConnectionRow> = sqlx::query_as(
            "SELECT id, exchange_id, exchange_name, region_id, region_name, provider, latency, \
             quality, color, start_lat, start_lng, end_lat, end_lng \
             FROM connections ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Connection::from).collect())
    }

    pub async fn count_connections(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM connections")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ========== Latency samples ==========

    /// Set a connection's current latency and append the matching sample.
    ///
    /// Both writes share one transaction, so readers never see the current
    /// value without its sample row.
    pub async fn record_latency(
        &self,
        connection_id: &str,
        latency: u32,
        quality: Quality,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE connections SET latency = ?, quality = ? WHERE id = ?")
            .bind(latency)
            .bind(quality.as_str())
            .bind(connection_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(MonitorError::NotFound(format!("connection {}", connection_id)));
        }

        let inserted = sqlx::query(
            "INSERT INTO latency_samples (connection_id, latency, quality, timestamp_ms) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(connection_id)
        .bind(latency)
        .bind(quality.as_str())
        .bind(timestamp.timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted.last_insert_rowid())
    }

    /// Samples for the given connections, ascending by time
    pub async fn samples_for_connections(
        &self,
        connection_ids: &[String],
        range: LatencyRange,
    ) -> Result<Vec<LatencySample>> {
        if connection_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, connection_id, latency, quality, timestamp_ms \
             FROM latency_samples WHERE connection_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in connection_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(")");

        if let Some(min) = range.min {
            qb.push(" AND latency >= ").push_bind(min);
        }
        if let Some(max) = range.max {
            qb.push(" AND latency <= ").push_bind(max);
        }
        qb.push(" ORDER BY timestamp_ms ASC, id ASC");

        let rows: Vec<SampleRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LatencySample::from).collect())
    }

    /// Count, sum and maximum of sample latencies, keyed by connection id
    pub async fn sample_aggregates(&self) -> Result<HashMap<String, SampleAggregate>> {
        let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
            "SELECT connection_id, COUNT(*), SUM(latency), MAX(latency) \
             FROM latency_samples GROUP BY connection_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, data_points, total, peak)| {
                let peak = u32::try_from(peak).unwrap_or_default();
                (id, SampleAggregate { data_points, total, peak })
            })
            .collect())
    }

    /// Most recent sample per connection id (timestamp, then insert order)
    pub async fn latest_samples(&self) -> Result<HashMap<String, LatencySample>> {
        let rows: Vec<SampleRow> = sqlx::query_as(
            "SELECT id, connection_id, latency, quality, timestamp_ms FROM ( \
                 SELECT id, connection_id, latency, quality, timestamp_ms, \
                        ROW_NUMBER() OVER ( \
                            PARTITION BY connection_id ORDER BY timestamp_ms DESC, id DESC \
                        ) AS rn \
                 FROM latency_samples \
             ) WHERE rn = 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let sample = LatencySample::from(row);
                (sample.connection_id.clone(), sample)
            })
            .collect())
    }

    /// Delete samples strictly older than `cutoff`
    pub async fn prune_samples_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM latency_samples WHERE timestamp_ms < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_samples(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM latency_samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn upsert_exchange<'e, E>(executor: E, exchange: &ExchangeServer) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let preferred = serde_json::to_string(&exchange.preferred_regions)?;

    sqlx::query(
        "INSERT INTO exchanges (exchange_id, exchange_code, exchange_name, base_country, lat, lng, \
         preferred_regions, logo_url, provider, status, last_ping_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(exchange_id) DO UPDATE SET \
         exchange_code = excluded.exchange_code, exchange_name = excluded.exchange_name, \
         base_country = excluded.base_country, lat = excluded.lat, lng = excluded.lng, \
         preferred_regions = excluded.preferred_regions, logo_url = excluded.logo_url, \
         provider = excluded.provider, status = excluded.status, \
         last_ping_ms = excluded.last_ping_ms",
    )
    .bind(&exchange.exchange_id)
    .bind(&exchange.exchange_code)
    .bind(&exchange.exchange_name)
    .bind(&exchange.base_country)
    .bind(exchange.coordinates.lat)
    .bind(exchange.coordinates.lng)
    .bind(preferred)
    .bind(&exchange.logo_url)
    .bind(&exchange.provider)
    .bind(exchange.status.as_str())
    .bind(exchange.last_ping.map(|t| t.timestamp_millis()))
    .execute(executor)
    .await?;

    Ok(())
}

async fn upsert_cloud_region<'e, E>(executor: E, region: &CloudRegion) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO cloud_regions (region_code, provider_id, provider_name, location_type, \
         region_name, country, city, lat, lng, alpha2, is_active, available_capacity) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(region_code) DO UPDATE SET \
         provider_id = excluded.provider_id, provider_name = excluded.provider_name, \
         location_type = excluded.location_type, region_name = excluded.region_name, \
         country = excluded.country, city = excluded.city, lat = excluded.lat, \
         lng = excluded.lng, alpha2 = excluded.alpha2, is_active = excluded.is_active, \
         available_capacity = excluded.available_capacity",
    )
    .bind(&region.region_code)
    .bind(&region.provider_id)
    .bind(&region.provider_name)
    .bind(&region.location_type)
    .bind(&region.region_name)
    .bind(&region.country)
    .bind(&region.city)
    .bind(region.coordinates.lat)
    .bind(region.coordinates.lng)
    .bind(&region.alpha2)
    .bind(region.is_active)
    .bind(region.available_capacity)
    .execute(executor)
    .await?;

    Ok(())
}

async fn upsert_server_location<'e, E>(executor: E, location: &ServerLocation) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO server_locations (location_id, alpha2, latitude, longitude, name, region, \
         subregion) VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(location_id) DO UPDATE SET \
         alpha2 = excluded.alpha2, latitude = excluded.latitude, \
         longitude = excluded.longitude, name = excluded.name, \
         region = excluded.region, subregion = excluded.subregion",
    )
    .bind(&location.location_id)
    .bind(&location.alpha2)
    .bind(&location.latitude)
    .bind(&location.longitude)
    .bind(&location.name)
    .bind(&location.region)
    .bind(&location.subregion)
    .execute(executor)
    .await?;

    Ok(())
}
