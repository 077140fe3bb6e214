//! Core metric types for the accumulator
//!
//! A [`ResourceMetrics`] batch groups metrics by the instrumentation scope
//! that produced them. Every [`Metric`] carries exactly one kind of data
//! ([`MetricData`]) and one or more datapoints of that kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Nanoseconds since the UNIX epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000_000))
    }

    pub fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000_000))
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Subtract a duration, clamping at the epoch
    pub fn saturating_sub(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(duration_nanos(duration)))
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(duration_nanos(rhs)))
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Value of a single label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl AttributeValue {
    /// Render the value the way it appears in a timeseries signature
    pub fn as_string(&self) -> String {
        match self {
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Double(d) => d.to_string(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Double(v)
    }
}

/// Labels attached to a datapoint
///
/// Keys are unique and kept in sorted order, so two label sets built from the
/// same pairs in a different order are equal and iterate identically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: BTreeMap<String, AttributeValue>,
}

impl LabelSet {
    pub fn new(labels: BTreeMap<String, AttributeValue>) -> Self {
        LabelSet { labels }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a label set from key/value pairs; a repeated key keeps the last value
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        pairs.into_iter().collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.labels.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.labels.get(key)
    }

    /// Iterate labels in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelSet {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The named producer (library or subsystem) that emitted a group of metrics
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InstrumentationScope {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl InstrumentationScope {
    pub fn new(name: impl Into<String>) -> Self {
        InstrumentationScope {
            name: name.into(),
            version: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Aggregation temporality of sums and histograms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporality {
    #[default]
    Unspecified,
    /// Each value covers the interval since the previous report
    Delta,
    /// Each value is the running total since a fixed start time
    Cumulative,
}

/// Scalar payload of gauge and sum datapoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

impl NumberValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int(i) => *i as f64,
            NumberValue::Double(d) => *d,
        }
    }
}

impl From<i64> for NumberValue {
    fn from(v: i64) -> Self {
        NumberValue::Int(v)
    }
}

impl From<f64> for NumberValue {
    fn from(v: f64) -> Self {
        NumberValue::Double(v)
    }
}

/// Accessors shared by every datapoint shape
pub trait DataPoint: Clone {
    fn labels(&self) -> &LabelSet;
    fn timestamp(&self) -> Timestamp;
}

/// Datapoint of a gauge or sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberDataPoint {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub start_timestamp: Timestamp,
    pub timestamp: Timestamp,
    pub value: NumberValue,
}

impl NumberDataPoint {
    pub fn new(labels: LabelSet, timestamp: Timestamp, value: impl Into<NumberValue>) -> Self {
        NumberDataPoint {
            labels,
            start_timestamp: Timestamp::ZERO,
            timestamp,
            value: value.into(),
        }
    }

    pub fn with_start_timestamp(mut self, start: Timestamp) -> Self {
        self.start_timestamp = start;
        self
    }
}

/// Datapoint of an explicit-bucket histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramDataPoint {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub start_timestamp: Timestamp,
    pub timestamp: Timestamp,
    pub count: u64,
    pub sum: f64,
    /// One more entry than `explicit_bounds`; the last bucket is unbounded
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
}

impl HistogramDataPoint {
    pub fn new(labels: LabelSet, timestamp: Timestamp) -> Self {
        HistogramDataPoint {
            labels,
            start_timestamp: Timestamp::ZERO,
            timestamp,
            count: 0,
            sum: 0.0,
            bucket_counts: vec![0],
            explicit_bounds: Vec::new(),
        }
    }

    /// Set the buckets and derive `count` from them
    pub fn with_buckets(mut self, explicit_bounds: Vec<f64>, bucket_counts: Vec<u64>) -> Self {
        self.count = bucket_counts.iter().sum();
        self.explicit_bounds = explicit_bounds;
        self.bucket_counts = bucket_counts;
        self
    }

    pub fn with_sum(mut self, sum: f64) -> Self {
        self.sum = sum;
        self
    }
}

/// A single quantile of a summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAtQuantile {
    pub quantile: f64,
    pub value: f64,
}

/// Datapoint of a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDataPoint {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub start_timestamp: Timestamp,
    pub timestamp: Timestamp,
    pub count: u64,
    pub sum: f64,
    #[serde(default)]
    pub quantile_values: Vec<ValueAtQuantile>,
}

impl SummaryDataPoint {
    pub fn new(labels: LabelSet, timestamp: Timestamp, count: u64, sum: f64) -> Self {
        SummaryDataPoint {
            labels,
            start_timestamp: Timestamp::ZERO,
            timestamp,
            count,
            sum,
            quantile_values: Vec::new(),
        }
    }

    pub fn with_quantile(mut self, quantile: f64, value: f64) -> Self {
        self.quantile_values.push(ValueAtQuantile { quantile, value });
        self
    }
}

/// One side (positive or negative) of an exponential histogram
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExponentialBuckets {
    pub offset: i32,
    pub bucket_counts: Vec<u64>,
}

/// Datapoint of an exponential histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentialHistogramDataPoint {
    #[serde(default)]
    pub labels: LabelSet,
    #[serde(default)]
    pub start_timestamp: Timestamp,
    pub timestamp: Timestamp,
    pub count: u64,
    pub sum: f64,
    pub scale: i32,
    pub zero_count: u64,
    #[serde(default)]
    pub positive: ExponentialBuckets,
    #[serde(default)]
    pub negative: ExponentialBuckets,
}

macro_rules! impl_data_point {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DataPoint for $ty {
                fn labels(&self) -> &LabelSet {
                    &self.labels
                }

                fn timestamp(&self) -> Timestamp {
                    self.timestamp
                }
            }
        )*
    };
}

impl_data_point!(
    NumberDataPoint,
    HistogramDataPoint,
    SummaryDataPoint,
    ExponentialHistogramDataPoint,
);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Gauge {
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sum {
    pub data_points: Vec<NumberDataPoint>,
    #[serde(default)]
    pub temporality: Temporality,
    #[serde(default)]
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Histogram {
    pub data_points: Vec<HistogramDataPoint>,
    #[serde(default)]
    pub temporality: Temporality,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub data_points: Vec<SummaryDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExponentialHistogram {
    pub data_points: Vec<ExponentialHistogramDataPoint>,
    #[serde(default)]
    pub temporality: Temporality,
}

/// Kind of a metric, used as the first component of its signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// No data was set on the metric
    None,
    Gauge,
    Sum,
    Histogram,
    Summary,
    ExponentialHistogram,
}

impl MetricKind {
    /// Canonical name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::None => "None",
            MetricKind::Gauge => "Gauge",
            MetricKind::Sum => "Sum",
            MetricKind::Histogram => "Histogram",
            MetricKind::Summary => "Summary",
            MetricKind::ExponentialHistogram => "ExponentialHistogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of a metric
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricData {
    #[default]
    Empty,
    Gauge(Gauge),
    Sum(Sum),
    Histogram(Histogram),
    Summary(Summary),
    ExponentialHistogram(ExponentialHistogram),
}

impl MetricData {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricData::Empty => MetricKind::None,
            MetricData::Gauge(_) => MetricKind::Gauge,
            MetricData::Sum(_) => MetricKind::Sum,
            MetricData::Histogram(_) => MetricKind::Histogram,
            MetricData::Summary(_) => MetricKind::Summary,
            MetricData::ExponentialHistogram(_) => MetricKind::ExponentialHistogram,
        }
    }

    pub fn data_point_count(&self) -> usize {
        match self {
            MetricData::Empty => 0,
            MetricData::Gauge(g) => g.data_points.len(),
            MetricData::Sum(s) => s.data_points.len(),
            MetricData::Histogram(h) => h.data_points.len(),
            MetricData::Summary(s) => s.data_points.len(),
            MetricData::ExponentialHistogram(h) => h.data_points.len(),
        }
    }

    /// Timestamp of the first datapoint, if there is one
    pub fn first_timestamp(&self) -> Option<Timestamp> {
        match self {
            MetricData::Empty => None,
            MetricData::Gauge(g) => g.data_points.first().map(DataPoint::timestamp),
            MetricData::Sum(s) => s.data_points.first().map(DataPoint::timestamp),
            MetricData::Histogram(h) => h.data_points.first().map(DataPoint::timestamp),
            MetricData::Summary(s) => s.data_points.first().map(DataPoint::timestamp),
            MetricData::ExponentialHistogram(h) => {
                h.data_points.first().map(DataPoint::timestamp)
            }
        }
    }
}

/// A named metric with its description, unit and datapoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub data: MetricData,
}

impl Metric {
    pub fn new(name: impl Into<String>, data: MetricData) -> Self {
        Metric {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data,
        }
    }

    pub fn gauge(name: impl Into<String>, data_points: Vec<NumberDataPoint>) -> Self {
        Self::new(name, MetricData::Gauge(Gauge { data_points }))
    }

    pub fn sum(
        name: impl Into<String>,
        temporality: Temporality,
        is_monotonic: bool,
        data_points: Vec<NumberDataPoint>,
    ) -> Self {
        Self::new(
            name,
            MetricData::Sum(Sum {
                data_points,
                temporality,
                is_monotonic,
            }),
        )
    }

    pub fn histogram(
        name: impl Into<String>,
        temporality: Temporality,
        data_points: Vec<HistogramDataPoint>,
    ) -> Self {
        Self::new(
            name,
            MetricData::Histogram(Histogram {
                data_points,
                temporality,
            }),
        )
    }

    pub fn summary(name: impl Into<String>, data_points: Vec<SummaryDataPoint>) -> Self {
        Self::new(name, MetricData::Summary(Summary { data_points }))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn kind(&self) -> MetricKind {
        self.data.kind()
    }
}

/// Metrics produced by one instrumentation scope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeMetrics {
    #[serde(default)]
    pub scope: InstrumentationScope,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl ScopeMetrics {
    pub fn new(scope: InstrumentationScope, metrics: Vec<Metric>) -> Self {
        ScopeMetrics { scope, metrics }
    }
}

/// A batch of metrics as delivered by a scrape or receive pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceMetrics {
    #[serde(default)]
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the metrics of one scope to the batch
    pub fn with_scope(mut self, scope: InstrumentationScope, metrics: Vec<Metric>) -> Self {
        self.scope_metrics.push(ScopeMetrics::new(scope, metrics));
        self
    }

    /// Total number of datapoints in the batch, across all scopes and kinds
    pub fn data_point_count(&self) -> usize {
        self.scope_metrics
            .iter()
            .flat_map(|sm| sm.metrics.iter())
            .map(|m| m.data.data_point_count())
            .sum()
    }
}
