use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod ingest;
pub mod tags;
pub mod worker;

pub use ingest::{DefaultIngestMetrics, IngestCounters, IngestCountersSnapshot, IngestMetrics};
pub use worker::{DefaultWorkerTelemetry, WorkerTelemetry};

/// Histogram summary captured in telemetry snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// Total number of samples recorded.
    pub count: u64,
    /// Sum of all sample values.
    pub total: u64,
    /// Minimum sample value observed.
    pub min: u64,
    /// Maximum sample value observed.
    pub max: u64,
    /// Arithmetic mean of all sample values.
    pub mean: f64,
}

/// In-memory view of collected telemetry metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Map of counter names to their current values.
    pub counters: BTreeMap<String, u64>,
    /// Map of gauge names to their current values.
    pub gauges: BTreeMap<String, u64>,
    /// Map of histogram names to their summarized snapshots.
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    /// Returns the value of a counter if it exists.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    /// Returns the value of a gauge if it exists.
    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    /// Returns the snapshot of a histogram if it exists.
    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }
}

/// Increments a named counter by `value`.
///
/// Labels are currently unused in the internal registry but preserved for API compatibility.
#[inline]
pub fn increment_counter(name: &'static str, value: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::increment_counter(name, value);

    let _ = (name, value);
}

/// Records a histogram sample.
#[inline]
pub fn record_histogram(name: &'static str, value: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::record_histogram(name, value);

    let _ = (name, value);
}

/// Sets a gauge to an absolute value.
#[inline]
pub fn set_gauge(name: &'static str, value: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::set_gauge(name, value);

    let _ = (name, value);
}

/// Adds `delta` to a gauge.
#[inline]
pub fn add_gauge(name: &'static str, delta: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::add_gauge(name, delta);

    let _ = (name, delta);
}

/// Subtracts `delta` from a gauge with floor at zero.
#[inline]
pub fn sub_gauge_saturating(name: &'static str, delta: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::sub_gauge_saturating(name, delta);

    let _ = (name, delta);
}

/// Returns a point-in-time snapshot of all collected telemetry.
pub fn snapshot() -> TelemetrySnapshot {
    #[cfg(feature = "telemetry")]
    {
        registry::snapshot()
    }

    #[cfg(not(feature = "telemetry"))]
    {
        TelemetrySnapshot::default()
    }
}

/// Clears in-memory telemetry state.
pub fn reset() {
    #[cfg(feature = "telemetry")]
    registry::reset();
}

#[cfg(feature = "telemetry")]
mod registry {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use super::{HistogramSnapshot, TelemetrySnapshot};

    #[derive(Debug, Clone, Copy, Default)]
    struct Histogram {
        count: u64,
        total: u64,
        min: u64,
        max: u64,
    }

    impl Histogram {
        fn record(&mut self, value: u64) {
            self.min = if self.count == 0 { value } else { self.min.min(value) };
            self.max = self.max.max(value);
            self.count = self.count.saturating_add(1);
            self.total = self.total.saturating_add(value);
        }

        fn summary(&self) -> HistogramSnapshot {
            let mean = match self.count {
                0 => 0.0,
                count => self.total as f64 / count as f64,
            };
            HistogramSnapshot {
                count: self.count,
                total: self.total,
                min: self.min,
                max: self.max,
                mean,
            }
        }
    }

    #[derive(Default)]
    struct Registry {
        counters: BTreeMap<&'static str, u64>,
        gauges: BTreeMap<&'static str, u64>,
        histograms: BTreeMap<&'static str, Histogram>,
    }

    fn registry() -> MutexGuard<'static, Registry> {
        static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
        let mutex = REGISTRY.get_or_init(Mutex::default);
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(super) fn increment_counter(name: &'static str, value: u64) {
        let mut registry = registry();
        let counter = registry.counters.entry(name).or_insert(0);
        *counter = counter.saturating_add(value);
    }

    pub(super) fn record_histogram(name: &'static str, value: u64) {
        registry().histograms.entry(name).or_default().record(value);
    }

    pub(super) fn set_gauge(name: &'static str, value: u64) {
        registry().gauges.insert(name, value);
    }

    pub(super) fn add_gauge(name: &'static str, delta: u64) {
        let mut registry = registry();
        let gauge = registry.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_add(delta);
    }

    pub(super) fn sub_gauge_saturating(name: &'static str, delta: u64) {
        let mut registry = registry();
        let gauge = registry.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_sub(delta);
    }

    pub(super) fn snapshot() -> TelemetrySnapshot {
        let registry = registry();
        TelemetrySnapshot {
            counters: registry
                .counters
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect(),
            gauges: registry
                .gauges
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect(),
            histograms: registry
                .histograms
                .iter()
                .map(|(name, histogram)| ((*name).to_owned(), histogram.summary()))
                .collect(),
        }
    }

    pub(super) fn reset() {
        let mut registry = registry();
        registry.counters.clear();
        registry.gauges.clear();
        registry.histograms.clear();
    }
}
