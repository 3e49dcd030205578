//! Exchange latency monitor backend
//!
//! Simulates latency between crypto exchanges and cloud regions, keeps the
//! sample log, and serves history, metrics and live views to the dashboard.
//!
//! ## Architecture
//!
//! ```text
//! LatencyUpdater (interval) → Storage (connections + samples)
//!                                   ↓
//!                    Analytics (history, metrics, snapshot, overview)
//!                                   ↓
//!                    API (axum) ← Radar client (upstream series)
//! ```

pub mod analytics;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod simulator;
pub mod storage;
pub mod types;

#[cfg(test)]
pub mod testing;

#[cfg(test)]
mod error_tests;
