//! Reporter Module
//!
//! Periodically translates a metrics registry into InfluxDB points and writes
//! them, while a health check recreates the client when the store stops
//! answering.

pub mod sender;
pub mod service;
pub mod supervisor;
pub mod tags;
pub mod translator;

pub use sender::BatchSender;
pub use service::{Reporter, ReporterBuilder, PING_INTERVAL};
pub use supervisor::{ConnectionSupervisor, HealthCheck};
pub use tags::merge_tags;
pub use translator::{MetricTranslator, PERCENTILES, PERCENTILE_KEYS};

use crate::error::Result;
use crate::metrics::Registry;
use crate::store::TagSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Report `registry` to InfluxDB every `interval` until `shutdown` fires.
///
/// Returns early only when the url is invalid or the client cannot be
/// created. Send and ping failures are logged and the loop keeps going.
pub async fn influxdb(
    registry: Arc<dyn Registry>,
    interval: Duration,
    url: &str,
    database: &str,
    username: &str,
    password: &str,
    shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    influxdb_with_tags(
        registry,
        interval,
        url,
        database,
        username,
        password,
        TagSet::new(),
        shutdown,
    )
    .await
}

/// Like [`influxdb`], adding `tags` to every point.
#[allow(clippy::too_many_arguments)]
pub async fn influxdb_with_tags(
    registry: Arc<dyn Registry>,
    interval: Duration,
    url: &str,
    database: &str,
    username: &str,
    password: &str,
    tags: TagSet,
    shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let reporter = Reporter::builder(registry)
        .url(url)
        .database(database)
        .credentials(username, password)
        .tags(tags)
        .interval(interval)
        .build()?;

    reporter.run(shutdown).await;
    Ok(())
}
