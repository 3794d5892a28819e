//! Metrics Registry

use super::Metric;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// A named collection of live metrics the reporter can walk.
///
/// Visit order is unspecified. Implementations must tolerate concurrent
/// updates of the metrics while `each` runs.
pub trait Registry: Send + Sync {
    fn each(&self, f: &mut dyn FnMut(&str, &Metric));
}

/// Concurrent in-memory registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    metrics: DashMap<String, Metric>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric under `name`.
    ///
    /// Returns false and leaves the registry untouched when the name is
    /// already taken.
    pub fn register(&self, name: impl Into<String>, metric: Metric) -> bool {
        match self.metrics.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(metric);
                true
            }
        }
    }

    /// Return the metric registered under `name`, registering the one built
    /// by `f` first when there is none.
    pub fn get_or_register<F>(&self, name: &str, f: F) -> Metric
    where
        F: FnOnce() -> Metric,
    {
        self.metrics
            .entry(name.to_string())
            .or_insert_with(f)
            .value()
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.get(name).map(|entry| entry.value().clone())
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.remove(name).map(|(_, metric)| metric)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Registry for MetricsRegistry {
    fn each(&self, f: &mut dyn FnMut(&str, &Metric)) {
        // Copy entries out so no shard lock is held while snapshots run.
        let entries: Vec<(String, Metric)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (name, metric) in &entries {
            f(name, metric);
        }
    }
}
