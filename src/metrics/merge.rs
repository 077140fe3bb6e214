//! Per-kind merge policies
//!
//! Every policy has the same shape: compute the signature of each incoming
//! datapoint, look at the snapshot currently stored for it and replace that
//! snapshot unless the incoming datapoint is older. Policies differ in the
//! temporality gate they apply and in which fields of the stored metric they
//! force rather than copy.
//!
//! The look-up and the replacement run under the key's shard lock (see
//! [`AggregationStore::update`]), so the returned counts are exact even when
//! several batches race on the same signature.

use super::signature::SignatureEncoder;
use super::store::{AccumulatedValue, AggregationStore};
use super::types::{
    DataPoint, Gauge, Histogram, InstrumentationScope, Metric, MetricData, Sum, Summary,
    Temporality, Timestamp,
};

/// Where and when a metric is merged
pub struct MergeTarget<'a> {
    pub store: &'a AggregationStore,
    pub scope: &'a InstrumentationScope,
    /// Wall-clock time recorded as the snapshot's last update
    pub now: Timestamp,
}

impl<'a> MergeTarget<'a> {
    pub fn new(
        store: &'a AggregationStore,
        scope: &'a InstrumentationScope,
        now: Timestamp,
    ) -> Self {
        MergeTarget { store, scope, now }
    }

    /// Keep the gauge datapoint with the latest timestamp
    pub fn gauge(&self, metric: &Metric, gauge: &Gauge) -> usize {
        self.merge_points(metric, &gauge.data_points, |point| {
            MetricData::Gauge(Gauge {
                data_points: vec![point.clone()],
            })
        })
    }

    /// Keep the latest datapoint of a cumulative sum; other temporalities are dropped
    pub fn sum(&self, metric: &Metric, sum: &Sum) -> usize {
        if sum.temporality != Temporality::Cumulative {
            return 0;
        }

        self.merge_points(metric, &sum.data_points, |point| {
            MetricData::Sum(Sum {
                data_points: vec![point.clone()],
                temporality: Temporality::Cumulative,
                is_monotonic: sum.is_monotonic,
            })
        })
    }

    /// Keep the latest datapoint of a cumulative histogram; other temporalities are dropped
    pub fn histogram(&self, metric: &Metric, histogram: &Histogram) -> usize {
        if histogram.temporality != Temporality::Cumulative {
            return 0;
        }

        self.merge_points(metric, &histogram.data_points, |point| {
            MetricData::Histogram(Histogram {
                data_points: vec![point.clone()],
                temporality: Temporality::Cumulative,
            })
        })
    }

    /// Keep the latest summary datapoint
    ///
    /// Staleness is judged against the first datapoint of the stored
    /// snapshot, which is the only one the store ever keeps.
    pub fn summary(&self, metric: &Metric, summary: &Summary) -> usize {
        self.merge_points(metric, &summary.data_points, |point| {
            MetricData::Summary(Summary {
                data_points: vec![point.clone()],
            })
        })
    }

    fn merge_points<P, F>(&self, metric: &Metric, points: &[P], single: F) -> usize
    where
        P: DataPoint,
        F: Fn(&P) -> MetricData,
    {
        let mut stored = 0;

        for point in points {
            let signature = SignatureEncoder::for_metric(&self.scope.name, metric, point.labels());

            let accepted = self.store.update(&signature, |current| {
                if let Some(current) = current {
                    let stale = current
                        .data_point_timestamp()
                        .is_some_and(|cached| point.timestamp() < cached);
                    if stale {
                        return None;
                    }
                }

                Some(AccumulatedValue::new(
                    snapshot_metric(metric, single(point)),
                    self.scope.clone(),
                    self.now,
                ))
            });

            if accepted {
                stored += 1;
            }
        }

        stored
    }
}

/// Copy name, description and unit of `metric` around a single-point payload
fn snapshot_metric(metric: &Metric, data: MetricData) -> Metric {
    Metric {
        name: metric.name.clone(),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        data,
    }
}
