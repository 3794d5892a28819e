//! Reporter Demo
//!
//! Registers a few metrics, updates them from a background task and reports
//! them to InfluxDB until Ctrl+C.
//!
//! Configuration is read from `INFLUXDB_REPORTER_*` variables, e.g.
//! `INFLUXDB_REPORTER_URL=http://localhost:8086 INFLUXDB_REPORTER_INTERVAL=2s`.

use anyhow::Result;
use influxdb_reporter::{
    metrics::{Metric, StandardCounter, StandardGauge, StandardGaugeCollection, Tag},
    ConfigManager, MetricsRegistry, Reporter, ShutdownCoordinator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting InfluxDB Reporter Demo");

    let mut config = ConfigManager::load_from_env()?;
    config.tags.entry("app".to_string()).or_insert_with(|| "reporter_demo".to_string());

    let registry = Arc::new(MetricsRegistry::new());
    let requests = Arc::new(StandardCounter::new());
    let queue_depth = Arc::new(StandardGauge::new());
    let latencies = Arc::new(StandardGaugeCollection::new());
    registry.register("demo.requests", Metric::Counter(requests.clone()));
    registry.register("demo.queue_depth", Metric::Gauge(queue_depth.clone()));
    registry.register("demo.latency_ms", Metric::GaugeCollection(latencies.clone()));

    let (errors_tx, mut errors_rx) = mpsc::unbounded_channel();
    let reporter = Reporter::builder_from_config(&config, registry.clone())?
        .error_sink(errors_tx)
        .build()?;

    let coordinator = ShutdownCoordinator::new(Duration::from_secs(10));
    let reporter_handle = reporter.spawn(coordinator.subscribe());

    let mut workload_shutdown = coordinator.subscribe();
    let workload = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        let mut step: i64 = 0;
        loop {
            tokio::select! {
                _ = workload_shutdown.recv() => break,
                _ = ticker.tick() => {
                    step += 1;
                    requests.inc(1);
                    queue_depth.update(step % 17);
                    let endpoint = if step % 2 == 0 { "/users" } else { "/orders" };
                    latencies.add_with_tag(5.0 + (step % 40) as f64, Tag::new("endpoint", endpoint));
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Some(e) = errors_rx.recv().await {
            warn!("Reporter error: {}", e);
        }
    });

    info!(
        "Reporting to {} (database {}) every {:?}, press Ctrl+C to stop",
        config.url, config.database, config.interval
    );

    coordinator.listen_for_signals().await?;
    let _ = workload.await;
    coordinator.wait_for(reporter_handle).await?;

    info!("Demo stopped");
    Ok(())
}
