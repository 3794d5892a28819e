//! Metrics Module
//!
//! The metric kinds the reporter understands and the registry it walks.

pub mod registry;
pub mod standard;
pub mod types;

pub use registry::{MetricsRegistry, Registry};
pub use standard::{StandardCounter, StandardGauge, StandardGaugeCollection, StandardGaugeFloat};
pub use types::{
    Counter, CounterSnapshot, Gauge, GaugeCollection, GaugeCollectionSnapshot, GaugeFloat,
    GaugeSnapshot, Histogram, HistogramSnapshot, Meter, MeterSnapshot, Metric, Reading, Tag,
    Timer, TimerSnapshot,
};
