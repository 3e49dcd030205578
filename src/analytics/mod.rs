//! Read-side latency analytics
//!
//! - `history`: per-connection time series with connection and sample filters
//! - `metrics`: per-connection average / peak / sample count
//! - `snapshot`: latest sample per connection for the live map
//! - `overview`: dashboard counters and the location bundle

pub mod history;
pub mod metrics;
pub mod overview;
pub mod snapshot;


pub use history::{latency_history, ConnectionHistory, HistoryFilter, HistoryQuery};
pub use metrics::{latency_metrics, mean_2dp, ConnectionMetric, PLACEHOLDER_LOGO, RELIABILITY_PLACEHOLDER};
pub use overview::{locations, overview_metrics, ExchangeLocation, LocationBundle, OverviewMetrics, ProviderLocation};
pub use snapshot::{live_snapshot, merge_latest, LiveConnection};
