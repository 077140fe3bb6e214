//! Last-value accumulator
//!
//! Receives metric batches, keeps the latest datapoint per timeseries and
//! hands a point-in-time snapshot to a pull-based exporter. Entries that have
//! not been refreshed within the configured expiration window are dropped
//! lazily, while collecting.

use super::merge::MergeTarget;
use super::store::{AccumulatedValue, AggregationStore};
use super::types::{InstrumentationScope, Metric, MetricData, ResourceMetrics, Timestamp};
use crate::clock::{Clock, SystemClock};
use crate::config::AccumulatorConfig;
use std::time::Duration;
use tracing::{debug, error};

/// Stores aggregated metric values and serves them for export
pub trait Accumulator: Send + Sync {
    /// Merge a batch into the cache, returning how many datapoints were stored
    fn accumulate(&self, batch: &ResourceMetrics) -> usize;

    /// Return every live cached metric, evicting expired ones
    fn collect(&self) -> Vec<Metric>;
}

/// Keeps the last value of every timeseries
pub struct LastValueAccumulator<C: Clock = SystemClock> {
    store: AggregationStore,
    /// How long a timeseries is served after its last update
    metric_expiration: Duration,
    clock: C,
}

impl LastValueAccumulator<SystemClock> {
    pub fn new(config: &AccumulatorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> LastValueAccumulator<C> {
    pub fn with_clock(config: &AccumulatorConfig, clock: C) -> Self {
        LastValueAccumulator {
            store: AggregationStore::new(),
            metric_expiration: config.metric_expiration,
            clock,
        }
    }

    pub fn metric_expiration(&self) -> Duration {
        self.metric_expiration
    }

    /// Number of timeseries currently cached, expired or not
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Direct access to the cached snapshots
    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Like [`Accumulator::collect`], keeping the producing scope of every metric
    pub fn collect_scoped(&self) -> Vec<(InstrumentationScope, Metric)> {
        self.sweep(|value| (value.scope.clone(), value.metric.clone()))
    }

    fn add_metric(&self, metric: &Metric, scope: &InstrumentationScope, now: Timestamp) -> usize {
        debug!("accumulating metric: {}", metric.name);

        let target = MergeTarget::new(&self.store, scope, now);
        match &metric.data {
            MetricData::Gauge(gauge) => target.gauge(metric, gauge),
            MetricData::Sum(sum) => target.sum(metric, sum),
            MetricData::Histogram(histogram) => target.histogram(metric, histogram),
            MetricData::Summary(summary) => target.summary(metric, summary),
            MetricData::Empty | MetricData::ExponentialHistogram(_) => {
                error!(
                    data_type = %metric.kind(),
                    metric_name = %metric.name,
                    "failed to translate metric"
                );
                0
            }
        }
    }

    /// Drop expired entries and map every surviving one through `f`
    fn sweep<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(&AccumulatedValue) -> T,
    {
        debug!("accumulator collect called");

        let expiration_boundary = self.clock.now().saturating_sub(self.metric_expiration);
        let mut collected = Vec::new();

        self.store.retain(|_, value| {
            if value.updated < expiration_boundary {
                debug!("metric expired: {}", value.metric.name);
                return false;
            }
            collected.push(f(value));
            true
        });

        collected
    }
}

impl<C: Clock> Accumulator for LastValueAccumulator<C> {
    fn accumulate(&self, batch: &ResourceMetrics) -> usize {
        let now = self.clock.now();

        batch
            .scope_metrics
            .iter()
            .flat_map(|sm| sm.metrics.iter().map(move |m| (&sm.scope, m)))
            .map(|(scope, metric)| self.add_metric(metric, scope, now))
            .sum()
    }

    fn collect(&self) -> Vec<Metric> {
        self.sweep(|value| value.metric.clone())
    }
}
