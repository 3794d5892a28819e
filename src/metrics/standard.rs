//! Standard Metric Implementations
//!
//! Thread-safe counters and settable gauges for hosts that do not bring
//! their own. Histograms, meters and timers are supplied by the host through
//! the traits in [`super::types`].

use super::{
    Counter, CounterSnapshot, Gauge, GaugeCollection, GaugeCollectionSnapshot, GaugeFloat,
    GaugeSnapshot, Reading, Tag,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonic-by-convention counter.
#[derive(Debug, Default)]
pub struct StandardCounter {
    count: AtomicI64,
}

impl StandardCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Counter for StandardCounter {
    fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            count: self.count(),
        }
    }
}

#[derive(Debug, Clone)]
struct GaugeState<T> {
    value: T,
    tag: Option<Tag>,
}

/// Latest value plus enough bookkeeping for `clear` to leave alone an
/// update that arrived after the snapshot being acknowledged.
#[derive(Debug)]
struct GaugeCell<T> {
    current: Option<GaugeState<T>>,
    updates: u64,
    snapshotted: u64,
}

impl<T> Default for GaugeCell<T> {
    fn default() -> Self {
        Self {
            current: None,
            updates: 0,
            snapshotted: 0,
        }
    }
}

impl<T: Copy + Default> GaugeCell<T> {
    fn set(&mut self, value: T, tag: Option<Tag>) {
        self.updates = self.updates.wrapping_add(1);
        self.current = Some(GaugeState { value, tag });
    }

    fn snapshot(&mut self) -> GaugeSnapshot<T> {
        self.snapshotted = self.updates;
        match &self.current {
            Some(state) => GaugeSnapshot {
                value: state.value,
                is_set: true,
                tag: state.tag.clone(),
            },
            None => GaugeSnapshot::unset(),
        }
    }

    fn clear(&mut self) {
        if self.updates == self.snapshotted {
            self.current = None;
        }
    }
}

/// Settable integer gauge. Unset until the first update.
///
/// `clear` forgets the value returned by the last snapshot only, a newer
/// update survives until the next one.
#[derive(Debug, Default)]
pub struct StandardGauge {
    cell: Mutex<GaugeCell<i64>>,
}

impl StandardGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.cell.lock().set(value, None);
    }

    pub fn update_with_tag(&self, value: i64, tag: Tag) {
        self.cell.lock().set(value, Some(tag));
    }
}

impl Gauge for StandardGauge {
    fn snapshot(&self) -> GaugeSnapshot<i64> {
        self.cell.lock().snapshot()
    }

    fn clear(&self) {
        self.cell.lock().clear();
    }
}

/// Settable floating point gauge, same clearing rules as [`StandardGauge`].
#[derive(Debug, Default)]
pub struct StandardGaugeFloat {
    cell: Mutex<GaugeCell<f64>>,
}

impl StandardGaugeFloat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        self.cell.lock().set(value, None);
    }

    pub fn update_with_tag(&self, value: f64, tag: Tag) {
        self.cell.lock().set(value, Some(tag));
    }
}

impl GaugeFloat for StandardGaugeFloat {
    fn snapshot(&self) -> GaugeSnapshot<f64> {
        self.cell.lock().snapshot()
    }

    fn clear(&self) {
        self.cell.lock().clear();
    }
}

#[derive(Debug, Default)]
struct ReadingLog {
    readings: Vec<Reading>,
    snapshotted: usize,
}

/// Gauge that keeps every reading taken since the last clear, each with its
/// own timestamp.
///
/// `clear` drops the readings returned by the last snapshot, readings added
/// after it stay for the next one.
#[derive(Debug, Default)]
pub struct StandardGaugeCollection {
    log: Mutex<ReadingLog>,
}

impl StandardGaugeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at the current time.
    pub fn add(&self, value: f64) {
        self.add_at(Reading::new(value, Utc::now()));
    }

    pub fn add_with_tag(&self, value: f64, tag: Tag) {
        self.add_at(Reading::new(value, Utc::now()).with_tag(tag));
    }

    pub fn add_at(&self, reading: Reading) {
        self.log.lock().readings.push(reading);
    }

    /// Record `value` with an explicit timestamp.
    pub fn add_value_at(&self, value: f64, time: DateTime<Utc>) {
        self.add_at(Reading::new(value, time));
    }
}

impl GaugeCollection for StandardGaugeCollection {
    fn snapshot(&self) -> GaugeCollectionSnapshot {
        let mut log = self.log.lock();
        log.snapshotted = log.readings.len();
        GaugeCollectionSnapshot {
            is_set: !log.readings.is_empty(),
            readings: log.readings.clone(),
        }
    }

    fn clear(&self) {
        let mut log = self.log.lock();
        let taken = log.snapshotted.min(log.readings.len());
        log.readings.drain(..taken);
        log.snapshotted = 0;
    }
}
