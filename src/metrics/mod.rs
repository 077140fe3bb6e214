//! Last-value metrics accumulation
//!
//! This module caches the latest datapoint of every timeseries seen in
//! incoming metric batches and serves them to a pull-based exporter:
//!
//! - **Signatures** identify a timeseries by kind, scope, name and labels
//! - **Merge policies** decide per metric kind whether a datapoint replaces
//!   the cached one
//! - **Sharded store** keeps concurrent writers on different timeseries apart
//! - **Lazy expiration** evicts timeseries that stopped reporting on collect

mod types;
mod signature;
mod store;
mod merge;
mod accumulator;

pub use types::{
    AttributeValue, DataPoint, ExponentialBuckets, ExponentialHistogram,
    ExponentialHistogramDataPoint, Gauge, Histogram, HistogramDataPoint, InstrumentationScope,
    LabelSet, Metric, MetricData, MetricKind, NumberDataPoint, NumberValue, ResourceMetrics,
    ScopeMetrics, Sum, Summary, SummaryDataPoint, Temporality, Timestamp, ValueAtQuantile,
};
pub use signature::{SignatureEncoder, SIGNATURE_SEPARATOR};
pub use store::{AccumulatedValue, AggregationStore};
pub use merge::MergeTarget;
pub use accumulator::{Accumulator, LastValueAccumulator};
