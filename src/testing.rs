//! Test doubles shared by the unit tests.

use crate::error::{ReporterError, Result};
use crate::metrics::{
    Gauge, GaugeCollection, GaugeCollectionSnapshot, GaugeFloat, GaugeSnapshot, Histogram,
    HistogramSnapshot, Meter, MeterSnapshot, Timer, TimerSnapshot,
};
use crate::store::{BatchPoints, ConnectionSettings, Connector, Pong, StoreClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Gauge returning a fixed snapshot and counting `clear()` calls.
pub struct FakeGauge {
    snapshot: GaugeSnapshot<i64>,
    clears: AtomicUsize,
}

impl FakeGauge {
    pub fn new(snapshot: GaugeSnapshot<i64>) -> Self {
        Self {
            snapshot,
            clears: AtomicUsize::new(0),
        }
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl Gauge for FakeGauge {
    fn snapshot(&self) -> GaugeSnapshot<i64> {
        self.snapshot.clone()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeGaugeFloat {
    snapshot: GaugeSnapshot<f64>,
    clears: AtomicUsize,
}

impl FakeGaugeFloat {
    pub fn new(snapshot: GaugeSnapshot<f64>) -> Self {
        Self {
            snapshot,
            clears: AtomicUsize::new(0),
        }
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl GaugeFloat for FakeGaugeFloat {
    fn snapshot(&self) -> GaugeSnapshot<f64> {
        self.snapshot.clone()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeGaugeCollection {
    snapshot: GaugeCollectionSnapshot,
    clears: AtomicUsize,
}

impl FakeGaugeCollection {
    pub fn new(snapshot: GaugeCollectionSnapshot) -> Self {
        Self {
            snapshot,
            clears: AtomicUsize::new(0),
        }
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl GaugeCollection for FakeGaugeCollection {
    fn snapshot(&self) -> GaugeCollectionSnapshot {
        self.snapshot.clone()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Distribution of 10 samples between 1 and 100, percentile `q` is `q * 1000`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeHistogram;

impl HistogramSnapshot for FakeHistogram {
    fn count(&self) -> i64 {
        10
    }

    fn max(&self) -> i64 {
        100
    }

    fn mean(&self) -> f64 {
        50.5
    }

    fn min(&self) -> i64 {
        1
    }

    fn std_dev(&self) -> f64 {
        2.0
    }

    fn variance(&self) -> f64 {
        4.0
    }

    fn percentiles(&self, qs: &[f64]) -> Vec<f64> {
        qs.iter().map(|q| q * 1000.0).collect()
    }
}

impl Histogram for FakeHistogram {
    fn snapshot(&self) -> Box<dyn HistogramSnapshot> {
        Box::new(*self)
    }
}

/// Timer with the [`FakeHistogram`] distribution and a mean rate of 0.5/s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeTimer;

impl HistogramSnapshot for FakeTimer {
    fn count(&self) -> i64 {
        FakeHistogram.count()
    }

    fn max(&self) -> i64 {
        FakeHistogram.max()
    }

    fn mean(&self) -> f64 {
        FakeHistogram.mean()
    }

    fn min(&self) -> i64 {
        FakeHistogram.min()
    }

    fn std_dev(&self) -> f64 {
        FakeHistogram.std_dev()
    }

    fn variance(&self) -> f64 {
        FakeHistogram.variance()
    }

    fn percentiles(&self, qs: &[f64]) -> Vec<f64> {
        FakeHistogram.percentiles(qs)
    }
}

impl TimerSnapshot for FakeTimer {
    fn rate1(&self) -> f64 {
        1.0
    }

    fn rate5(&self) -> f64 {
        5.0
    }

    fn rate15(&self) -> f64 {
        15.0
    }

    fn rate_mean(&self) -> f64 {
        0.5
    }
}

impl Timer for FakeTimer {
    fn snapshot(&self) -> Box<dyn TimerSnapshot> {
        Box::new(*self)
    }
}

pub struct FakeMeter {
    snapshot: MeterSnapshot,
}

impl FakeMeter {
    pub fn new(snapshot: MeterSnapshot) -> Self {
        Self { snapshot }
    }
}

impl Meter for FakeMeter {
    fn snapshot(&self) -> MeterSnapshot {
        self.snapshot
    }
}

/// In-memory store recording every write and ping.
///
/// Failures are scripted per call: queued write and ping results are
/// consumed first, an empty queue means success.
#[derive(Default)]
pub struct FakeStore {
    pub name: String,
    writes: Mutex<Vec<BatchPoints>>,
    write_results: Mutex<VecDeque<Result<()>>>,
    ping_results: Mutex<VecDeque<Result<()>>>,
    pings: AtomicUsize,
    always_fail_ping: bool,
}

impl FakeStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// A store whose every ping fails.
    pub fn unreachable(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            always_fail_ping: true,
            ..Default::default()
        })
    }

    pub fn fail_next_write(&self, message: &str) {
        self.write_results.lock().push_back(Err(ReporterError::Write {
            database: String::new(),
            points: 0,
            status: Some(500),
            message: message.to_string(),
        }));
    }

    pub fn fail_next_ping(&self, message: &str) {
        self.ping_results
            .lock()
            .push_back(Err(ReporterError::Ping(message.to_string())));
    }

    pub fn writes(&self) -> Vec<BatchPoints> {
        self.writes.lock().clone()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

/// Boxable handle onto a shared [`FakeStore`].
pub struct FakeClient(pub Arc<FakeStore>);

#[async_trait]
impl StoreClient for FakeClient {
    async fn write(&self, batch: &BatchPoints) -> Result<()> {
        let result = self.0.write_results.lock().pop_front().unwrap_or(Ok(()));
        let result = result.map_err(|e| match e {
            ReporterError::Write { status, message, .. } => ReporterError::Write {
                database: batch.database.clone(),
                points: batch.len(),
                status,
                message,
            },
            other => other,
        });
        if result.is_ok() {
            self.0.writes.lock().push(batch.clone());
        }
        result
    }

    async fn ping(&self) -> Result<Pong> {
        self.0.pings.fetch_add(1, Ordering::SeqCst);
        if self.0.always_fail_ping {
            return Err(ReporterError::Ping(format!("{} unreachable", self.0.name)));
        }
        let result = self.0.ping_results.lock().pop_front().unwrap_or(Ok(()));
        result.map(|_| Pong {
            latency: Duration::from_millis(1),
            version: "1.8.10".to_string(),
        })
    }
}

/// Connector handing out scripted connection outcomes in order.
///
/// Once the script is exhausted every further attempt fails.
#[derive(Default)]
pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Result<Arc<FakeStore>>>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(outcomes: Vec<Result<Arc<FakeStore>>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn StoreClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ReporterError::Connect("no more connections".to_string())));
        outcome.map(|store| Box::new(FakeClient(store)) as Box<dyn StoreClient>)
    }
}

pub fn settings() -> ConnectionSettings {
    ConnectionSettings::new("http://localhost:8086", "user", "pass")
        .expect("expected valid settings")
}
