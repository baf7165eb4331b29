//! Nature Remo E exporter
//!
//! Polls the Nature Remo cloud API for Echonet Lite smart meter readings and
//! writes them, together with an hourly energy consumption difference, to
//! InfluxDB.

pub mod config;
pub mod influx;
pub mod metering_remo;

// Re-export common types for easier access
pub use config::CONFIG;
pub use influx::{DataPoint, FieldValue, InfluxManager};
pub use metering_remo::RemoManager;
