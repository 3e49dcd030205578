//! Third-party API clients

pub mod radar;

pub use radar::{LatencyPoint, LatencySeries, RadarApi, RadarClient};
