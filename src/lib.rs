//! InfluxDB Reporter Library
//!
//! Periodically exports the metrics held in an in-process registry to an
//! InfluxDB 1.x server over HTTP.
//!
//! A [`Reporter`] walks the registry on every interval, turns each metric
//! into one or more points (tagged with the configured base tags), and writes
//! them as a single batch. A separate five-second health check pings the
//! server and recreates the client when the ping fails.

pub mod config;
pub mod error;
pub mod metrics;
pub mod reporter;
pub mod shutdown;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{ConfigManager, ReporterConfig};
pub use error::{ReporterError, Result};
pub use metrics::{Metric, MetricsRegistry, Registry};
pub use reporter::{influxdb, influxdb_with_tags, Reporter, ReporterBuilder};
pub use shutdown::ShutdownCoordinator;
