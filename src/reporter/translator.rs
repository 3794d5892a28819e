//! Metric Translator
//!
//! Maps one named metric snapshot to the data points written for it.

use super::tags::merge_tags;
use crate::metrics::{HistogramSnapshot, Metric, Registry};
use crate::store::{Point, TagSet};
use chrono::{DateTime, Utc};
use tracing::{trace, warn};

/// Quantiles exported for histograms and timers.
pub const PERCENTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.99, 0.999, 0.9999];

/// Field keys of [`PERCENTILES`], same order.
pub const PERCENTILE_KEYS: [&str; 6] = ["p50", "p75", "p95", "p99", "p999", "p9999"];

/// Converts metrics into points carrying the reporter's base tags.
#[derive(Debug, Clone, Default)]
pub struct MetricTranslator {
    tags: TagSet,
}

impl MetricTranslator {
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    /// The base tags every point starts from.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Translate every metric of `registry`, all sharing the same `now`.
    pub fn translate_all(&self, registry: &dyn Registry, now: DateTime<Utc>) -> Vec<Point> {
        let mut points = Vec::new();
        registry.each(&mut |name, metric| {
            self.translate_into(name, metric, now, &mut points);
        });
        points
    }

    /// Points for a single metric.
    pub fn translate(&self, name: &str, metric: &Metric, now: DateTime<Utc>) -> Vec<Point> {
        let mut points = Vec::new();
        self.translate_into(name, metric, now, &mut points);
        points
    }

    fn translate_into(
        &self,
        name: &str,
        metric: &Metric,
        now: DateTime<Utc>,
        points: &mut Vec<Point>,
    ) {
        match metric {
            Metric::Counter(counter) => {
                let snapshot = counter.snapshot();
                points.push(
                    Point::new(format!("{}.count", name), self.tags.clone(), now)
                        .field("value", snapshot.count),
                );
            }
            Metric::Gauge(gauge) => {
                let snapshot = gauge.snapshot();
                if snapshot.is_set {
                    let tags = merge_tags(&self.tags, snapshot.tag.as_ref());
                    points.push(
                        Point::new(format!("{}.gauge", name), tags, now)
                            .field("value", snapshot.value),
                    );
                    gauge.clear();
                }
            }
            Metric::GaugeFloat(gauge) => {
                let snapshot = gauge.snapshot();
                if snapshot.is_set {
                    let tags = merge_tags(&self.tags, snapshot.tag.as_ref());
                    points.push(
                        Point::new(format!("{}.gauge", name), tags, now)
                            .field("value", snapshot.value),
                    );
                    gauge.clear();
                }
            }
            Metric::GaugeCollection(collection) => {
                let snapshot = collection.snapshot();
                if snapshot.is_set {
                    // Each reading stays a plain gauge point with its own time.
                    let measurement = format!("{}.gauge", name);
                    for reading in &snapshot.readings {
                        let tags = merge_tags(&self.tags, reading.tag.as_ref());
                        points.push(
                            Point::new(measurement.clone(), tags, reading.time)
                                .field("value", reading.value),
                        );
                    }
                    collection.clear();
                }
            }
            Metric::Histogram(histogram) => {
                let snapshot = histogram.snapshot();
                let point = Point::new(format!("{}.histogram", name), self.tags.clone(), now);
                points.push(distribution_fields(point, &*snapshot));
            }
            Metric::Meter(meter) => {
                let snapshot = meter.snapshot();
                points.push(
                    Point::new(format!("{}.meter", name), self.tags.clone(), now)
                        .field("count", snapshot.count)
                        .field("m1", snapshot.rate1)
                        .field("m5", snapshot.rate5)
                        .field("m15", snapshot.rate15)
                        .field("mean", snapshot.rate_mean),
                );
            }
            Metric::Timer(timer) => {
                let snapshot = timer.snapshot();
                let point = Point::new(format!("{}.timer", name), self.tags.clone(), now);
                points.push(
                    distribution_fields(point, &*snapshot)
                        .field("m1", snapshot.rate1())
                        .field("m5", snapshot.rate5())
                        .field("m15", snapshot.rate15())
                        .field("meanrate", snapshot.rate_mean()),
                );
            }
            Metric::Other(_) => {
                trace!(metric = %name, "Skipping metric of unsupported kind");
            }
        }
    }
}

/// Summary and percentile fields shared by histograms and timers.
fn distribution_fields<S>(point: Point, snapshot: &S) -> Point
where
    S: HistogramSnapshot + ?Sized,
{
    let percentiles = snapshot.percentiles(&PERCENTILES);
    if percentiles.len() != PERCENTILES.len() {
        warn!(
            measurement = %point.measurement,
            expected = PERCENTILES.len(),
            returned = percentiles.len(),
            "Snapshot returned an unexpected number of percentiles"
        );
    }
    let mut point = point
        .field("count", snapshot.count())
        .field("max", snapshot.max())
        .field("mean", snapshot.mean())
        .field("min", snapshot.min())
        .field("stddev", snapshot.std_dev())
        .field("variance", snapshot.variance());
    for (key, value) in PERCENTILE_KEYS.iter().zip(percentiles) {
        point = point.field(*key, value);
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        GaugeCollection, GaugeCollectionSnapshot, GaugeSnapshot, MeterSnapshot, MetricsRegistry,
        Reading, StandardCounter, StandardGauge, StandardGaugeCollection, Tag,
    };
    use crate::store::FieldValue;
    use crate::testing::{
        FakeGauge, FakeGaugeCollection, FakeGaugeFloat, FakeHistogram, FakeMeter, FakeTimer,
    };
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn base_tags() -> TagSet {
        let mut tags = TagSet::new();
        tags.insert("host".to_string(), "h1".to_string());
        tags
    }

    #[test]
    fn test_counter() {
        let counter = Arc::new(StandardCounter::new());
        counter.inc(42);
        let translator = MetricTranslator::default();

        let points = translator.translate("reqs", &Metric::Counter(counter), now());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "reqs.count");
        assert_eq!(points[0].fields, vec![("value".to_string(), FieldValue::Integer(42))]);
        assert_eq!(points[0].time, now());
    }

    #[test]
    fn test_gauge_with_tag() {
        let gauge = Arc::new(StandardGauge::new());
        gauge.update_with_tag(10, Tag::new("sensor", "A"));
        let translator = MetricTranslator::new(base_tags());

        let points = translator.translate("temp", &Metric::Gauge(gauge.clone()), now());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "temp.gauge");
        assert_eq!(points[0].tags.get("host").map(String::as_str), Some("h1"));
        assert_eq!(points[0].tags.get("sensor").map(String::as_str), Some("A"));
        assert_eq!(points[0].get("value"), Some(&FieldValue::Integer(10)));
        assert!(!crate::metrics::Gauge::snapshot(&*gauge).is_set);
        assert_eq!(translator.tags(), &base_tags());
    }

    /// Distribution whose percentile query only answers the first three quantiles.
    struct ShortPercentiles;

    impl HistogramSnapshot for ShortPercentiles {
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
            qs.iter().take(3).map(|q| q * 1000.0).collect()
        }
    }

    #[test]
    fn test_short_percentile_answer_keeps_returned_fields() {
        let point = distribution_fields(
            Point::new("lat.histogram", TagSet::new(), now()),
            &ShortPercentiles,
        );

        assert_eq!(
            point.field_keys(),
            vec!["count", "max", "mean", "min", "stddev", "variance", "p50", "p75", "p95"]
        );
        assert_eq!(point.get("p95"), Some(&FieldValue::Float(0.95 * 1000.0)));
        assert!(point.get("p99").is_none());
    }

    /// Collection that receives another reading right after being snapshotted.
    struct RacingCollection {
        inner: StandardGaugeCollection,
        late_value: f64,
    }

    impl GaugeCollection for RacingCollection {
        fn snapshot(&self) -> GaugeCollectionSnapshot {
            let snapshot = self.inner.snapshot();
            self.inner.add_value_at(self.late_value, now());
            snapshot
        }

        fn clear(&self) {
            self.inner.clear();
        }
    }

    #[test]
    fn test_reading_added_during_translation_is_sent_next_tick() {
        let collection = Arc::new(RacingCollection {
            inner: StandardGaugeCollection::new(),
            late_value: 99.0,
        });
        collection.inner.add_value_at(1.0, now());
        let metric = Metric::GaugeCollection(collection.clone());
        let translator = MetricTranslator::default();

        let first = translator.translate("lat", &metric, now());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].get("value"), Some(&FieldValue::Float(1.0)));

        let pending = collection.inner.snapshot();
        assert_eq!(pending.readings.len(), 1);
        assert_eq!(pending.readings[0].value, 99.0);

        let second = translator.translate("lat", &metric, now());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].get("value"), Some(&FieldValue::Float(99.0)));
    }

    #[test]
    fn test_unset_gauges_are_skipped_without_clear() {
        let gauge = Arc::new(FakeGauge::new(GaugeSnapshot::unset()));
        let gauge_float = Arc::new(FakeGaugeFloat::new(GaugeSnapshot::unset()));
        let collection = Arc::new(FakeGaugeCollection::new(GaugeCollectionSnapshot {
            readings: vec![Reading::new(1.0, now())],
            is_set: false,
        }));
        let translator = MetricTranslator::new(base_tags());

        assert!(translator.translate("a", &Metric::Gauge(gauge.clone()), now()).is_empty());
        assert!(translator.translate("b", &Metric::GaugeFloat(gauge_float.clone()), now()).is_empty());
        assert!(translator.translate("c", &Metric::GaugeCollection(collection.clone()), now()).is_empty());
        assert_eq!(gauge.clears(), 0);
        assert_eq!(gauge_float.clears(), 0);
        assert_eq!(collection.clears(), 0);
    }

    #[test]
    fn test_set_gauge_float_cleared_once() {
        let gauge = Arc::new(FakeGaugeFloat::new(GaugeSnapshot {
            value: 0.25,
            is_set: true,
            tag: None,
        }));
        let translator = MetricTranslator::new(base_tags());

        let points = translator.translate("load", &Metric::GaugeFloat(gauge.clone()), now());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "load.gauge");
        assert_eq!(points[0].tags, base_tags());
        assert_eq!(points[0].get("value"), Some(&FieldValue::Float(0.25)));
        assert_eq!(gauge.clears(), 1);
    }

    #[test]
    fn test_gauge_collection_point_per_reading() {
        let first = Utc.timestamp_opt(1_699_999_990, 0).unwrap();
        let second = Utc.timestamp_opt(1_699_999_995, 500_000_000).unwrap();
        let collection = Arc::new(FakeGaugeCollection::new(GaugeCollectionSnapshot {
            readings: vec![
                Reading::new(1.5, first).with_tag(Tag::new("antenna", "1")),
                Reading::new(2.5, second),
            ],
            is_set: true,
        }));
        let translator = MetricTranslator::new(base_tags());

        let points = translator.translate(
            "rssi",
            &Metric::GaugeCollection(collection.clone()),
            now(),
        );

        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.measurement == "rssi.gauge"));
        assert_eq!(points[0].time, first);
        assert_eq!(points[0].tags.get("antenna").map(String::as_str), Some("1"));
        assert_eq!(points[0].get("value"), Some(&FieldValue::Float(1.5)));
        assert_eq!(points[1].time, second);
        assert_eq!(points[1].tags, base_tags());
        assert_eq!(collection.clears(), 1);
    }

    #[test]
    fn test_empty_gauge_collection_still_cleared() {
        let collection = Arc::new(FakeGaugeCollection::new(GaugeCollectionSnapshot {
            readings: vec![],
            is_set: true,
        }));
        let translator = MetricTranslator::default();

        let points = translator.translate(
            "rssi",
            &Metric::GaugeCollection(collection.clone()),
            now(),
        );

        assert!(points.is_empty());
        assert_eq!(collection.clears(), 1);
    }

    #[test]
    fn test_histogram_fields() {
        let translator = MetricTranslator::new(base_tags());

        let points = translator.translate(
            "latency",
            &Metric::Histogram(Arc::new(FakeHistogram::default())),
            now(),
        );

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "latency.histogram");
        assert_eq!(
            point.field_keys(),
            vec![
                "count", "max", "mean", "min", "stddev", "variance", "p50", "p75", "p95", "p99",
                "p999", "p9999"
            ]
        );
        assert_eq!(point.get("count"), Some(&FieldValue::Integer(10)));
        assert_eq!(point.get("max"), Some(&FieldValue::Integer(100)));
        assert_eq!(point.get("min"), Some(&FieldValue::Integer(1)));
        for (key, q) in PERCENTILE_KEYS.iter().zip(PERCENTILES) {
            assert_eq!(point.get(key), Some(&FieldValue::Float(q * 1000.0)), "{}", key);
        }
    }

    #[test]
    fn test_meter_fields() {
        let meter = Arc::new(FakeMeter::new(MeterSnapshot {
            count: 7,
            rate1: 1.0,
            rate5: 5.0,
            rate15: 15.0,
            rate_mean: 2.0,
        }));
        let translator = MetricTranslator::default();

        let points = translator.translate("hits", &Metric::Meter(meter), now());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement, "hits.meter");
        assert_eq!(points[0].field_keys(), vec!["count", "m1", "m5", "m15", "mean"]);
        assert_eq!(points[0].get("count"), Some(&FieldValue::Integer(7)));
        assert_eq!(points[0].get("m15"), Some(&FieldValue::Float(15.0)));
        assert_eq!(points[0].get("mean"), Some(&FieldValue::Float(2.0)));
    }

    #[test]
    fn test_timer_fields() {
        let translator = MetricTranslator::default();

        let points = translator.translate(
            "db.query",
            &Metric::Timer(Arc::new(FakeTimer::default())),
            now(),
        );

        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement, "db.query.timer");
        assert_eq!(
            point.field_keys(),
            vec![
                "count", "max", "mean", "min", "stddev", "variance", "p50", "p75", "p95", "p99",
                "p999", "p9999", "m1", "m5", "m15", "meanrate"
            ]
        );
        assert_eq!(point.get("p999"), Some(&FieldValue::Float(0.999 * 1000.0)));
        assert_eq!(point.get("meanrate"), Some(&FieldValue::Float(0.5)));
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let translator = MetricTranslator::default();

        let points = translator.translate("health", &Metric::Other(Arc::new("ok")), now());

        assert!(points.is_empty());
    }

    #[test]
    fn test_translate_all_shares_now() {
        let registry = MetricsRegistry::new();
        let counter = Arc::new(StandardCounter::new());
        counter.inc(1);
        registry.register("reqs", Metric::Counter(counter));
        registry.register("latency", Metric::Histogram(Arc::new(FakeHistogram::default())));
        registry.register("idle", Metric::Gauge(Arc::new(StandardGauge::new())));
        let translator = MetricTranslator::new(base_tags());

        let mut points = translator.translate_all(&registry, now());
        points.sort_by(|a, b| a.measurement.cmp(&b.measurement));

        let measurements: Vec<&str> = points.iter().map(|p| p.measurement.as_str()).collect();
        assert_eq!(measurements, vec!["latency.histogram", "reqs.count"]);
        assert!(points.iter().all(|p| p.time == now()));
        assert!(points.iter().all(|p| p.tags == base_tags()));
    }
}
