use super::*;
use crate::client::radar::MockRadarApi;
use crate::client::{LatencyPoint, LatencySeries};
use crate::testing::{at, connection, exchange, location, memory_db, region};
use crate::types::{Quality, ReferenceData};
use parking_lot::RwLock;
use serde_json::Value;

const ORIGIN: &str = "http://localhost:4028";

async fn spawn_app(radar: MockRadarApi, db: Database) -> String {
    let status = Arc::new(RwLock::new(UpdaterStatus::default()));
    let state = AppState::new(db, Arc::new(radar), status);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state, ORIGIN, std::future::pending()));
    format!("http://{}", addr)
}

async fn seeded_db() -> Database {
    let db = memory_db().await;
    db.import_reference(&ReferenceData {
        exchanges: vec![
            exchange("binance", "Binance", Some("https://logo/binance.png")),
            exchange("okx", "OKX", None),
        ],
        providers: vec![
            region("tokyo", "AWS", "Asia Pacific (Tokyo)", true),
            region("frankfurt", "GCP", "Europe (Frankfurt)", false),
        ],
        locations: vec![location("jp", "Japan")],
    })
    .await
    .unwrap();
    db.upsert_connection(&connection("binance-tokyo", "Binance", "AWS", "Asia Pacific (Tokyo)"))
        .await
        .unwrap();
    db.upsert_connection(&connection("okx-tokyo", "OKX", "AWS", "Asia Pacific (Tokyo)"))
        .await
        .unwrap();
    for (i, latency) in [10, 20, 30].into_iter().enumerate() {
        db.record_latency("binance-tokyo", latency, Quality::from_tick_latency(latency), at(i as i64))
            .await
            .unwrap();
    }
    db
}

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let base = spawn_app(MockRadarApi::new(), memory_db().await).await;
    let (status, body) = get_json(&format!("{}/api/health", base)).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["updater"]["running"], false);
    assert_eq!(body["updater"]["ticks"], 0);
}

#[tokio::test]
async fn test_latency_endpoints() {
    let base = spawn_app(MockRadarApi::new(), seeded_db().await).await;

    let (status, body) = get_json(&format!("{}/api/latency/latency", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let live = body["data"].as_array().unwrap();
    assert_eq!(live.len(), 2);
    assert_eq!(live[0]["id"], "binance-tokyo");
    assert_eq!(live[0]["latency"], 30);
    assert!(live[0]["latency"].is_u64());
    assert!(live[1]["latency"].is_null());
    assert_eq!(live[1]["quality"], "Unknown");

    let (_, body) = get_json(&format!("{}/api/latency/latencymetric", base)).await;
    let metric = &body["data"][0];
    assert_eq!(metric["avgLatency"], 20.0);
    assert_eq!(metric["peakLatency"], 30);
    assert_eq!(metric["dataPoints"], 3);
    assert_eq!(metric["reliability"], 100);
    assert_eq!(metric["logo"], "https://logo/binance.png");
    assert_eq!(body["data"][1]["logo"], "https://via.placeholder.com/40");
}

#[tokio::test]
async fn test_history_endpoint_filters() {
    let base = spawn_app(MockRadarApi::new(), seeded_db().await).await;

    let url = format!("{}/api/latency/latencyhistory?exchangeName=BINANCE&minLatency=20&provider=", base);
    let (status, body) = get_json(&url).await;
    assert_eq!(status, 200);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["exchangeName"], "Binance");
    let history = data[0]["latencyHistory"].as_object().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history["2025-01-01T00:00:02.000Z"], 30);
}

#[tokio::test]
async fn test_history_rejects_bad_number() {
    let base = spawn_app(MockRadarApi::new(), seeded_db().await).await;

    let (status, body) = get_json(&format!("{}/api/latency/latencyhistory?minLatency=abc", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upstream_proxy() {
    let mut radar = MockRadarApi::new();
    radar
        .expect_latency_series()
        .withf(|location, range| location == "US" && range == "7d")
        .times(1)
        .returning(|_, _| {
            Ok(LatencySeries {
                data: vec![LatencyPoint {
                    timestamp: "2025-01-01T00:00:00Z".to_string(),
                    p50: serde_json::json!("42"),
                }],
            })
        });
    let base = spawn_app(radar, memory_db().await).await;

    let (status, body) = get_json(&format!("{}/api/latency/latencylive?location=US&dateRange=7d", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["p50"], "42");
}

#[tokio::test]
async fn test_upstream_proxy_errors() {
    let mut radar = MockRadarApi::new();
    radar
        .expect_latency_series()
        .returning(|_, _| Err(MonitorError::Upstream("boom".to_string())));
    let base = spawn_app(radar, memory_db().await).await;

    let (status, body) = get_json(&format!("{}/api/latency/latencylive?location=US", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing location or dateRange");

    let (status, body) = get_json(&format!("{}/api/latency/latencylive?location=US&dateRange=1d", base)).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to fetch latency data");
}

#[tokio::test]
async fn test_reference_endpoints() {
    let base = spawn_app(MockRadarApi::new(), seeded_db().await).await;

    let (_, exchanges) = get_json(&format!("{}/api/data/exchanges", base)).await;
    let exchanges = exchanges.as_array().unwrap();
    assert_eq!(exchanges.len(), 2);
    assert!(exchanges[0].get("exchangeId").is_some());
    assert!(exchanges[0].get("coordinates").is_none());

    let (_, providers) = get_json(&format!("{}/api/data/providers", base)).await;
    let providers = providers.as_array().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["regionCode"], "tokyo");

    let (_, regions) = get_json(&format!("{}/api/data/regions", base)).await;
    assert_eq!(regions[0]["locationId"], "jp");
    assert_eq!(regions[0]["subregion"], "South-eastern Asia");

    let (_, overview) = get_json(&format!("{}/api/metrics", base)).await;
    assert_eq!(overview["activeExchanges"], 2);
    assert_eq!(overview["cloudRegions"], 1);
    assert_eq!(overview["serverLocations"], 1);

    let (_, locations) = get_json(&format!("{}/api/locations/locations", base)).await;
    assert_eq!(locations["success"], true);
    assert_eq!(locations["data"]["conn"].as_array().unwrap().len(), 2);
    assert_eq!(locations["data"]["connectedCloudRegions"][0]["id"], "tokyo");
    assert_eq!(locations["data"]["connectedExchanges"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_database_failure_is_generic_500() {
    let db = memory_db().await;
    let base = spawn_app(MockRadarApi::new(), db.clone()).await;
    db.close().await;

    let (status, body) = get_json(&format!("{}/api/latency/latencymetric", base)).await;
    assert_eq!(status, 500);
    assert_eq!(body, serde_json::json!({ "success": false, "message": "Internal Server Error" }));
}

#[tokio::test]
async fn test_cors_headers_and_preflight() {
    let base = spawn_app(MockRadarApi::new(), memory_db().await).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{}/api/health", base)).send().await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], ORIGIN);
    assert_eq!(resp.headers()["access-control-allow-credentials"], "true");

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/api/latency/latency", base))
        .header("Origin", ORIGIN)
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(resp.headers()["access-control-allow-methods"], "GET, POST, PUT, DELETE");
}
