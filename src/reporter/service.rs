//! Reporter Loop
//!
//! Drives the report ticker and the health-check ticker from a single task,
//! so handlers never overlap and the connection handle needs no lock.

use super::sender::BatchSender;
use super::supervisor::{ConnectionSupervisor, HealthCheck};
use super::translator::MetricTranslator;
use crate::config::ReporterConfig;
use crate::error::{ReporterError, Result};
use crate::metrics::Registry;
use crate::store::{ConnectionSettings, Connector, HttpConnector, Precision, TagSet, DEFAULT_TIMEOUT};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Period of the connection health check.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

/// Builder for [`Reporter`].
pub struct ReporterBuilder {
    registry: Arc<dyn Registry>,
    url: String,
    database: String,
    username: String,
    password: String,
    tags: TagSet,
    interval: Duration,
    timeout: Duration,
    retention_policy: Option<String>,
    precision: Precision,
    flush_on_shutdown: bool,
    connector: Arc<dyn Connector>,
    error_sink: Option<mpsc::UnboundedSender<ReporterError>>,
}

impl ReporterBuilder {
    fn new(registry: Arc<dyn Registry>) -> Self {
        let defaults = ReporterConfig::default();
        Self {
            registry,
            url: defaults.url,
            database: defaults.database,
            username: defaults.username,
            password: defaults.password,
            tags: defaults.tags,
            interval: defaults.interval,
            timeout: defaults.timeout,
            retention_policy: defaults.retention_policy,
            precision: defaults.precision,
            flush_on_shutdown: defaults.flush_on_shutdown,
            connector: Arc::new(HttpConnector),
            error_sink: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Replace the base tags added to every point.
    pub fn tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.retention_policy = Some(retention_policy.into());
        self
    }

    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn flush_on_shutdown(mut self, flush_on_shutdown: bool) -> Self {
        self.flush_on_shutdown = flush_on_shutdown;
        self
    }

    /// Use a custom store connector instead of the HTTP one.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Forward every send and health-check failure of the loop to `sink`.
    pub fn error_sink(mut self, sink: mpsc::UnboundedSender<ReporterError>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Parse the endpoint and create the store client.
    ///
    /// Fails without starting anything when the url is invalid or the client
    /// cannot be created.
    pub fn build(self) -> Result<Reporter> {
        if self.interval.is_zero() {
            return Err(ReporterError::Config(
                "interval must be greater than 0".to_string(),
            ));
        }
        if self.database.is_empty() {
            return Err(ReporterError::Config("database must not be empty".to_string()));
        }

        let timeout = if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        };
        let settings = ConnectionSettings::new(&self.url, self.username, self.password)?
            .with_timeout(timeout);
        let supervisor = ConnectionSupervisor::connect(self.connector, settings)?;

        Ok(Reporter {
            registry: self.registry,
            interval: self.interval,
            translator: MetricTranslator::new(self.tags),
            sender: BatchSender::new(self.database)
                .with_retention_policy(self.retention_policy)
                .with_precision(self.precision),
            supervisor,
            flush_on_shutdown: self.flush_on_shutdown,
            error_sink: self.error_sink,
        })
    }
}

/// Background exporter of a registry to InfluxDB.
pub struct Reporter {
    registry: Arc<dyn Registry>,
    interval: Duration,
    translator: MetricTranslator,
    sender: BatchSender,
    supervisor: ConnectionSupervisor,
    flush_on_shutdown: bool,
    error_sink: Option<mpsc::UnboundedSender<ReporterError>>,
}

impl Reporter {
    pub fn builder(registry: Arc<dyn Registry>) -> ReporterBuilder {
        ReporterBuilder::new(registry)
    }

    /// Build a reporter over the HTTP connector from a loaded configuration.
    pub fn from_config(config: &ReporterConfig, registry: Arc<dyn Registry>) -> Result<Self> {
        Self::builder_from_config(config, registry)?.build()
    }

    /// Builder preset from a validated configuration, for callers that also
    /// want an error sink or a custom connector.
    pub fn builder_from_config(
        config: &ReporterConfig,
        registry: Arc<dyn Registry>,
    ) -> Result<ReporterBuilder> {
        config
            .validate()
            .map_err(|e| ReporterError::Config(format!("{:#}", e)))?;

        let mut builder = Self::builder(registry)
            .url(config.url.clone())
            .database(config.database.clone())
            .credentials(config.username.clone(), config.password.clone())
            .tags(config.tags.clone())
            .interval(config.interval)
            .timeout(config.timeout)
            .precision(config.precision)
            .flush_on_shutdown(config.flush_on_shutdown);
        if let Some(rp) = &config.retention_policy {
            builder = builder.retention_policy(rp.clone());
        }
        Ok(builder)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    /// Snapshot the whole registry and write it as one batch.
    ///
    /// Returns the number of points written.
    pub async fn report(&self) -> Result<usize> {
        let now = Utc::now();
        let points = self.translator.translate_all(self.registry.as_ref(), now);
        self.sender.send(self.supervisor.client(), points).await
    }

    /// Ping the store, recreating the client when it does not answer.
    pub async fn check_connection(&mut self) -> Result<HealthCheck> {
        self.supervisor.check().await
    }

    /// Run until `shutdown` fires or its sender is dropped.
    ///
    /// Both tickers first fire one period after start. A failure in either
    /// handler is logged and forwarded to the error sink, the loop carries on.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            url = %self.supervisor.settings().url,
            database = %self.sender.database(),
            interval = ?self.interval,
            "Starting InfluxDB reporter"
        );

        let start = Instant::now();
        let mut report_ticker = time::interval_at(start + self.interval, self.interval);
        report_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ping_ticker = time::interval_at(start + PING_INTERVAL, PING_INTERVAL);
        ping_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    debug!("Reporter received shutdown signal");
                    break;
                }
                _ = report_ticker.tick() => self.on_report_tick().await,
                _ = ping_ticker.tick() => self.on_ping_tick().await,
            }
        }

        if self.flush_on_shutdown {
            debug!("Flushing metrics before shutdown");
            self.on_report_tick().await;
        }

        info!("InfluxDB reporter stopped");
    }

    /// Spawn [`Reporter::run`] on the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn on_report_tick(&self) {
        match self.report().await {
            Ok(points) => debug!(points, "Metrics sent to InfluxDB"),
            Err(e) => {
                error!(error = %e, "Unable to send metrics to InfluxDB");
                self.emit(e);
            }
        }
    }

    async fn on_ping_tick(&mut self) {
        match self.check_connection().await {
            Ok(HealthCheck::Healthy(pong)) => {
                debug!(latency = ?pong.latency, version = %pong.version, "InfluxDB ping succeeded");
            }
            Ok(HealthCheck::Reconnected { cause }) => {
                info!(cause = %cause, "Reconnected to InfluxDB");
                self.emit(cause);
            }
            Err(e) => {
                error!(error = %e, "Unable to recreate InfluxDB client");
                self.emit(e);
            }
        }
    }

    fn emit(&self, e: ReporterError) {
        if let Some(sink) = &self.error_sink {
            let _ = sink.send(e);
        }
    }
}
