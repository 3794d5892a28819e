//! Metrics Types
//!
//! Snapshot value objects and the per-kind traits the reporter reads from.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dimension attached to a reading at emission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One timestamped value of a gauge collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub time: DateTime<Utc>,
    pub tag: Option<Tag>,
}

impl Reading {
    pub fn new(value: f64, time: DateTime<Utc>) -> Self {
        Self {
            value,
            time,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Counter snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub count: i64,
}

/// Snapshot of a settable gauge.
///
/// `is_set` is false until the gauge receives its first value after creation
/// or after the last `clear()`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSnapshot<T> {
    pub value: T,
    pub is_set: bool,
    pub tag: Option<Tag>,
}

impl<T: Default> GaugeSnapshot<T> {
    /// A snapshot of a gauge that never received a value.
    pub fn unset() -> Self {
        Self {
            value: T::default(),
            is_set: false,
            tag: None,
        }
    }
}

/// Gauge collection snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GaugeCollectionSnapshot {
    pub readings: Vec<Reading>,
    pub is_set: bool,
}

/// Meter snapshot, rates are events per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

/// Read-only view over a sampled distribution.
///
/// Percentiles are computed by the implementation, the reporter only asks
/// for them.
pub trait HistogramSnapshot: Send + Sync {
    fn count(&self) -> i64;
    fn max(&self) -> i64;
    fn mean(&self) -> f64;
    fn min(&self) -> i64;
    fn std_dev(&self) -> f64;
    fn variance(&self) -> f64;
    /// Value at each quantile of `qs`, in the same order.
    fn percentiles(&self, qs: &[f64]) -> Vec<f64>;
}

/// A timer is a histogram of durations plus a meter of their rate.
pub trait TimerSnapshot: HistogramSnapshot {
    fn rate1(&self) -> f64;
    fn rate5(&self) -> f64;
    fn rate15(&self) -> f64;
    fn rate_mean(&self) -> f64;
}

pub trait Counter: Send + Sync {
    fn snapshot(&self) -> CounterSnapshot;
}

pub trait Gauge: Send + Sync {
    fn snapshot(&self) -> GaugeSnapshot<i64>;
    /// Forget what the last snapshot returned. Values recorded after that
    /// snapshot must survive.
    fn clear(&self);
}

pub trait GaugeFloat: Send + Sync {
    fn snapshot(&self) -> GaugeSnapshot<f64>;
    /// Same contract as [`Gauge::clear`].
    fn clear(&self);
}

pub trait GaugeCollection: Send + Sync {
    fn snapshot(&self) -> GaugeCollectionSnapshot;
    /// Same contract as [`Gauge::clear`].
    fn clear(&self);
}

pub trait Histogram: Send + Sync {
    fn snapshot(&self) -> Box<dyn HistogramSnapshot>;
}

pub trait Meter: Send + Sync {
    fn snapshot(&self) -> MeterSnapshot;
}

pub trait Timer: Send + Sync {
    fn snapshot(&self) -> Box<dyn TimerSnapshot>;
}

/// A registered metric instance.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<dyn Counter>),
    Gauge(Arc<dyn Gauge>),
    GaugeFloat(Arc<dyn GaugeFloat>),
    GaugeCollection(Arc<dyn GaugeCollection>),
    Histogram(Arc<dyn Histogram>),
    Meter(Arc<dyn Meter>),
    Timer(Arc<dyn Timer>),
    /// A kind the reporter does not export, such as a health check.
    Other(Arc<dyn Any + Send + Sync>),
}

impl Metric {
    /// Short name of the metric kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) => "gauge",
            Metric::GaugeFloat(_) => "gauge_float",
            Metric::GaugeCollection(_) => "gauge_collection",
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Timer(_) => "timer",
            Metric::Other(_) => "other",
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Metric").field(&self.kind()).finish()
    }
}
