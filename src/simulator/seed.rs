//! Initial connection generation
//!
//! Pairs random exchanges with random cloud regions and gives each pair a
//! starting latency, quality label and arc color.

use crate::error::Result;
use crate::storage::Database;
use crate::types::{CloudRegion, Connection, ExchangeServer, Quality};
use rand::Rng;
use std::collections::HashSet;

/// Build the connection record for one exchange/region pair
pub fn connection_for(exchange: &ExchangeServer, region: &CloudRegion, latency: u32) -> Connection {
    let (quality, color) = Quality::from_seed_latency(latency);

    Connection {
        id: format!("{}-{}", exchange.exchange_id, region.region_code),
        exchange_id: exchange.exchange_id.clone(),
        exchange_name: exchange.exchange_name.clone(),
        region_id: region.region_code.clone(),
        region_name: region.region_name.clone(),
        provider: region.provider_name.clone(),
        latency: Some(latency),
        quality: Some(quality),
        color: Some(color.to_string()),
        start_lat: exchange.coordinates.lat,
        start_lng: exchange.coordinates.lng,
        end_lat: region.coordinates.lat,
        end_lng: region.coordinates.lng,
    }
}

/// Draw `count` random exchange/region pairs.
///
/// Pairs may repeat; repeated ids collapse when stored.
pub fn generate_connections<R: Rng + ?Sized>(
    exchanges: &[ExchangeServer],
    regions: &[CloudRegion],
    count: usize,
    rng: &mut R,
) -> Vec<Connection> {
    if exchanges.is_empty() || regions.is_empty() {
        return Vec::new();
    }

    (0..count)
        .map(|_| {
            let exchange = &exchanges[rng.random_range(0..exchanges.len())];
            let region = &regions[rng.random_range(0..regions.len())];
            let latency = rng.random_range(10u32..130);
            connection_for(exchange, region, latency)
        })
        .collect()
}

/// Generate connections from the stored exchanges and active regions.
///
/// Returns the number of distinct connections written.
pub async fn seed_connections<R: Rng + ?Sized>(
    db: &Database,
    count: usize,
    rng: &mut R,
) -> Result<usize> {
    let exchanges = db.list_exchanges().await?;
    let regions = db.list_cloud_regions(true).await?;

    if exchanges.is_empty() || regions.is_empty() {
        tracing::warn!(
            "Cannot seed connections: {} exchanges, {} active regions",
            exchanges.len(),
            regions.len()
        );
        return Ok(0);
    }

    let connections = generate_connections(&exchanges, &regions, count, rng);
    let mut written = HashSet::new();
    for conn in &connections {
        db.upsert_connection(conn).await?;
        written.insert(conn.id.as_str());
    }

    tracing::info!(
        "Seeded {} connections ({} draws) from {} exchanges x {} regions",
        written.len(),
        count,
        exchanges.len(),
        regions.len()
    );
    Ok(written.len())
}
