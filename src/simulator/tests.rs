use super::*;
use crate::storage::LatencyRange;
use crate::testing::{at, connection, exchange, memory_db, region};
use std::collections::VecDeque;

/// Replays a fixed latency sequence, then repeats the last value
struct Scripted(VecDeque<u32>);

impl LatencySource for Scripted {
    fn next_latency(&mut self) -> u32 {
        if self.0.len() > 1 {
            self.0.pop_front().unwrap()
        } else {
            *self.0.front().unwrap_or(&0)
        }
    }
}

fn scripted(values: &[u32]) -> Scripted {
    Scripted(values.iter().copied().collect())
}

async fn db_with_connections(ids: &[&str]) -> Database {
    let db = memory_db().await;
    for id in ids {
        db.upsert_connection(&connection(id, "Binance", "AWS", "Tokyo")).await.unwrap();
    }
    db
}

#[test]
fn test_uniform_latency_in_range() {
    let mut source = UniformLatency::seeded(200, 42);
    for _ in 0..10_000 {
        assert!(source.next_latency() < 200);
    }
}

#[test]
fn test_uniform_latency_seeded_is_deterministic() {
    let mut a = UniformLatency::seeded(200, 7);
    let mut b = UniformLatency::seeded(200, 7);
    let xs: Vec<u32> = (0..20).map(|_| a.next_latency()).collect();
    let ys: Vec<u32> = (0..20).map(|_| b.next_latency()).collect();
    assert_eq!(xs, ys);
}

#[test]
fn test_uniform_latency_zero_upper_bound() {
    let mut source = UniformLatency::seeded(0, 1);
    assert_eq!(source.next_latency(), 0);
}

#[tokio::test]
async fn test_tick_updates_every_connection() {
    let db = db_with_connections(&["a-r1", "b-r2", "c-r3"]).await;
    let mut updater =
        LatencyUpdater::new(db.clone(), UniformLatency::seeded(200, 3), &UpdaterConfig::default());

    let report = updater.tick().await.unwrap();
    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 0);

    for conn in db.list_connections().await.unwrap() {
        let latency = conn.latency.unwrap();
        assert!(latency < 200);
        assert_eq!(conn.quality, Some(Quality::from_tick_latency(latency)));
    }
    assert_eq!(db.count_samples().await.unwrap(), 3);
}

#[tokio::test]
async fn test_tick_quality_labels() {
    let db = db_with_connections(&["a-r1", "b-r2", "c-r3"]).await;
    let mut updater =
        LatencyUpdater::new(db.clone(), scripted(&[49, 50, 100]), &UpdaterConfig::default());
    updater.tick().await.unwrap();

    // list_connections orders by id, matching draw order
    let qualities: Vec<_> = db
        .list_connections()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.quality.unwrap())
        .collect();
    assert_eq!(qualities, vec![Quality::Good, Quality::Average, Quality::Poor]);
}

#[tokio::test]
async fn test_tick_sample_matches_current_value() {
    let db = db_with_connections(&["a-r1"]).await;
    let mut updater = LatencyUpdater::new(db.clone(), scripted(&[77]), &UpdaterConfig::default());
    updater.tick().await.unwrap();

    let conn = &db.list_connections().await.unwrap()[0];
    let latest = db.latest_samples().await.unwrap();
    assert_eq!(conn.latency, Some(latest["a-r1"].latency));
    assert_eq!(conn.quality, latest["a-r1"].quality);
}

#[tokio::test]
async fn test_tick_with_no_connections() {
    let db = memory_db().await;
    let mut updater = LatencyUpdater::new(db, scripted(&[1]), &UpdaterConfig::default());
    assert_eq!(updater.tick().await.unwrap(), TickReport::default());
}

#[tokio::test]
async fn test_tick_prunes_expired_samples() {
    let db = db_with_connections(&["a-r1"]).await;
    db.record_latency("a-r1", 10, Quality::Good, at(0)).await.unwrap();

    let mut updater = LatencyUpdater::new(db.clone(), scripted(&[20]), &UpdaterConfig::default());
    let report = updater.tick().await.unwrap();

    assert_eq!(report.pruned, 1);
    let samples = db
        .samples_for_connections(&["a-r1".to_string()], LatencyRange::default())
        .await
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].latency, 20);
}

#[tokio::test]
async fn test_tick_keeps_samples_when_retention_disabled() {
    let db = db_with_connections(&["a-r1"]).await;
    db.record_latency("a-r1", 10, Quality::Good, at(0)).await.unwrap();

    let config = UpdaterConfig {
        retention_hours: 0,
        ..UpdaterConfig::default()
    };
    let mut updater = LatencyUpdater::new(db.clone(), scripted(&[20]), &config);
    let report = updater.tick().await.unwrap();

    assert_eq!(report.pruned, 0);
    assert_eq!(db.count_samples().await.unwrap(), 2);
}

#[tokio::test]
async fn test_tick_retention_beyond_date_range_skips_prune() {
    let db = db_with_connections(&["a-r1"]).await;
    db.record_latency("a-r1", 10, Quality::Good, at(0)).await.unwrap();

    let config = UpdaterConfig {
        retention_hours: 3_000_000_000,
        ..UpdaterConfig::default()
    };
    assert!(config.retention().is_some());

    let mut updater = LatencyUpdater::new(db.clone(), scripted(&[20]), &config);
    let report = updater.tick().await.unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.pruned, 0);
    assert_eq!(db.count_samples().await.unwrap(), 2);
}

#[tokio::test]
async fn test_spawned_updater_keeps_ticking_with_huge_retention() {
    let db = db_with_connections(&["a-r1"]).await;
    let config = UpdaterConfig {
        retention_hours: 3_000_000_000,
        ..UpdaterConfig::default()
    };
    let handle = LatencyUpdater::new(db.clone(), scripted(&[20]), &config)
        .with_interval(Duration::from_millis(10))
        .spawn();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = handle.status();
    assert!(status.read().ticks >= 2);
    assert!(status.read().running);

    handle.stop().await;
    assert!(!status.read().running);
}

#[tokio::test]
async fn test_tick_fails_when_store_unavailable() {
    let db = db_with_connections(&["a-r1"]).await;
    let mut updater = LatencyUpdater::new(db.clone(), scripted(&[20]), &UpdaterConfig::default());
    db.close().await;

    assert!(updater.tick().await.is_err());
}

#[tokio::test]
async fn test_spawned_updater_ticks_and_stops() {
    let db = db_with_connections(&["a-r1", "b-r2"]).await;
    let updater = LatencyUpdater::new(db.clone(), UniformLatency::seeded(200, 9), &UpdaterConfig::default())
        .with_interval(Duration::from_millis(20));

    let handle = updater.spawn();
    assert!(handle.status().read().running);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let status = handle.status();
    handle.stop().await;

    let status = status.read();
    assert!(!status.running);
    assert!(status.ticks >= 1);
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.last_report.map(|r| r.updated), Some(2));
    drop(status);

    assert!(db.count_samples().await.unwrap() >= 2);
}

#[tokio::test]
async fn test_spawned_updater_survives_tick_errors() {
    let db = db_with_connections(&["a-r1"]).await;
    let updater = LatencyUpdater::new(db.clone(), scripted(&[5]), &UpdaterConfig::default())
        .with_interval(Duration::from_millis(10));
    db.close().await;

    let handle = updater.spawn();
    tokio::time::sleep(Duration::from_millis(80)).await;
    let status = handle.status();
    handle.stop().await;

    let status = status.read();
    assert!(status.consecutive_failures >= 1);
    assert!(status.last_report.is_none());
}

#[test]
fn test_generate_connections_labels_and_ids() {
    let exchanges = vec![exchange("binance", "Binance", None), exchange("okx", "OKX", None)];
    let regions = vec![
        region("ap-northeast-1", "AWS", "Asia Pacific (Tokyo)", true),
        region("europe-west1", "GCP", "Belgium", true),
    ];
    let mut rng = StdRng::seed_from_u64(11);

    let conns = generate_connections(&exchanges, &regions, 50, &mut rng);
    assert_eq!(conns.len(), 50);
    for conn in &conns {
        let latency = conn.latency.unwrap();
        assert!((10..130).contains(&latency));
        let (quality, color) = Quality::from_seed_latency(latency);
        assert_eq!(conn.quality, Some(quality));
        assert_eq!(conn.color.as_deref(), Some(color));
        assert_eq!(conn.id, format!("{}-{}", conn.exchange_id, conn.region_id));
    }
}

#[test]
fn test_generate_connections_empty_inputs() {
    let mut rng = StdRng::seed_from_u64(1);
    let regions = vec![region("ap-northeast-1", "AWS", "Tokyo", true)];
    assert!(generate_connections(&[], &regions, 10, &mut rng).is_empty());
}

#[test]
fn test_connection_for_uses_endpoints() {
    let ex = exchange("bybit", "Bybit", None);
    let reg = region("ap-southeast-1", "AWS", "Asia Pacific (Singapore)", true);
    let conn = connection_for(&ex, &reg, 45);

    assert_eq!(conn.id, "bybit-ap-southeast-1");
    assert_eq!(conn.provider, "AWS");
    assert_eq!((conn.start_lat, conn.start_lng), (ex.coordinates.lat, ex.coordinates.lng));
    assert_eq!((conn.end_lat, conn.end_lng), (reg.coordinates.lat, reg.coordinates.lng));
    assert_eq!(conn.quality, Some(Quality::Good));
}

#[tokio::test]
async fn test_seed_connections_uses_active_regions_only() {
    let db = memory_db().await;
    db.upsert_exchange(&exchange("binance", "Binance", None)).await.unwrap();
    db.upsert_cloud_region(&region("ap-northeast-1", "AWS", "Tokyo", true)).await.unwrap();
    db.upsert_cloud_region(&region("us-central1", "GCP", "Iowa", false)).await.unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let written = seed_connections(&db, 10, &mut rng).await.unwrap();

    assert_eq!(written, 1);
    let conns = db.list_connections().await.unwrap();
    assert_eq!(conns.len(), 1);
    assert_eq!(conns[0].id, "binance-ap-northeast-1");
}

#[tokio::test]
async fn test_seed_connections_without_reference_data() {
    let db = memory_db().await;
    let mut rng = StdRng::seed_from_u64(5);
    assert_eq!(seed_connections(&db, 10, &mut rng).await.unwrap(), 0);
}
