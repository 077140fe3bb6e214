//! Accumulator Integration Tests
//!
//! Exercises the accumulator through its public API, verifying:
//! - Gauge last-write semantics and equal-timestamp overwrite
//! - Cumulative-only sums and histograms
//! - Summary staleness
//! - Cross-kind and cross-scope isolation
//! - Expiration on collect

use metrics_accumulator::metrics::{
    HistogramDataPoint, InstrumentationScope, LabelSet, MetricData, MetricKind, NumberDataPoint,
    NumberValue, SignatureEncoder, SummaryDataPoint, Temporality, Timestamp,
};
use metrics_accumulator::{
    Accumulator, AccumulatorConfig, LastValueAccumulator, Metric, ResourceMetrics,
    SimulatedClock,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

fn accumulator(expiration: Duration) -> (LastValueAccumulator<SimulatedClock>, SimulatedClock) {
    let clock = SimulatedClock::new(Timestamp::from_secs(1_700_000_000));
    let config = AccumulatorConfig {
        metric_expiration: expiration,
    };
    (LastValueAccumulator::with_clock(&config, clock.clone()), clock)
}

fn scraped(metrics: Vec<Metric>) -> ResourceMetrics {
    ResourceMetrics::new().with_scope(InstrumentationScope::new("scraper"), metrics)
}

fn host_labels() -> LabelSet {
    LabelSet::from_pairs([("host", "web01"), ("env", "prod")])
}

fn cpu_gauge(ts: u64, value: f64) -> Metric {
    Metric::gauge(
        "system.cpu.load",
        vec![NumberDataPoint::new(host_labels(), Timestamp(ts), value)],
    )
}

fn number_value(metric: &Metric) -> NumberValue {
    match &metric.data {
        MetricData::Gauge(g) => g.data_points[0].value,
        MetricData::Sum(s) => s.data_points[0].value,
        other => panic!("Expected number datapoint, got {:?}", other.kind()),
    }
}

// ============================================================================
// Gauge Tests
// ============================================================================

#[test]
fn test_gauge_last_write_ties_favor_latest_call() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));

    assert_eq!(acc.accumulate(&scraped(vec![cpu_gauge(100, 10.0)])), 1);
    assert_eq!(acc.accumulate(&scraped(vec![cpu_gauge(50, 5.0)])), 0);
    assert_eq!(number_value(&acc.collect()[0]), NumberValue::Double(10.0));

    assert_eq!(acc.accumulate(&scraped(vec![cpu_gauge(200, 20.0)])), 1);

    let collected = acc.collect();
    assert_eq!(collected.len(), 1);
    assert_eq!(number_value(&collected[0]), NumberValue::Double(20.0));
}

#[test]
fn test_gauge_equal_timestamp_overwrite() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));

    acc.accumulate(&scraped(vec![cpu_gauge(100, 10.0)]));
    assert_eq!(acc.accumulate(&scraped(vec![cpu_gauge(100, 99.0)])), 1);

    assert_eq!(number_value(&acc.collect()[0]), NumberValue::Double(99.0));
}

#[test]
fn test_gauge_any_arrival_order_keeps_latest() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..20 {
        let (acc, _clock) = accumulator(Duration::from_secs(300));
        let mut timestamps: Vec<u64> = (1..=25).collect();
        timestamps.shuffle(&mut rng);

        for ts in timestamps {
            acc.accumulate(&scraped(vec![cpu_gauge(ts, ts as f64)]));
        }

        let collected = acc.collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(number_value(&collected[0]), NumberValue::Double(25.0));
    }
}

#[test]
fn test_label_order_does_not_split_timeseries() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));

    let forward = LabelSet::from_pairs([("host", "web01"), ("env", "prod"), ("dc", "east")]);
    let backward = LabelSet::from_pairs([("dc", "east"), ("env", "prod"), ("host", "web01")]);

    acc.accumulate(&scraped(vec![Metric::gauge(
        "mem.used",
        vec![NumberDataPoint::new(forward, Timestamp(1), 1.0)],
    )]));
    acc.accumulate(&scraped(vec![Metric::gauge(
        "mem.used",
        vec![NumberDataPoint::new(backward, Timestamp(2), 2.0)],
    )]));

    assert_eq!(acc.len(), 1);
    assert_eq!(number_value(&acc.collect()[0]), NumberValue::Double(2.0));
}

// ============================================================================
// Sum / Histogram Temporality Tests
// ============================================================================

#[test]
fn test_delta_sum_never_collected() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let points: Vec<NumberDataPoint> = (0..10)
        .map(|i| {
            NumberDataPoint::new(
                LabelSet::from_pairs([("shard", i as i64)]),
                Timestamp(i + 1),
                i as i64,
            )
        })
        .collect();

    let delta = Metric::sum("http.requests", Temporality::Delta, true, points);
    for _ in 0..3 {
        assert_eq!(acc.accumulate(&scraped(vec![delta.clone()])), 0);
    }

    assert!(acc.collect().is_empty());
}

#[test]
fn test_cumulative_sum_keeps_monotonic_flag() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let metric = Metric::sum(
        "http.requests",
        Temporality::Cumulative,
        true,
        vec![NumberDataPoint::new(host_labels(), Timestamp(10), 1234i64)],
    )
    .with_description("Total HTTP requests")
    .with_unit("{request}");

    assert_eq!(acc.accumulate(&scraped(vec![metric])), 1);

    let collected = acc.collect();
    assert_eq!(collected[0].description, "Total HTTP requests");
    assert_eq!(collected[0].unit, "{request}");
    match &collected[0].data {
        MetricData::Sum(s) => {
            assert!(s.is_monotonic);
            assert_eq!(s.temporality, Temporality::Cumulative);
            assert_eq!(s.data_points[0].value, NumberValue::Int(1234));
        }
        other => panic!("Expected sum, got {:?}", other.kind()),
    }
}

#[test]
fn test_cumulative_histogram_replaced_by_newer() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let histogram = |ts: u64, counts: Vec<u64>| {
        Metric::histogram(
            "http.latency",
            Temporality::Cumulative,
            vec![HistogramDataPoint::new(host_labels(), Timestamp(ts))
                .with_buckets(vec![0.005, 0.05, 0.5], counts)],
        )
    };

    assert_eq!(acc.accumulate(&scraped(vec![histogram(10, vec![1, 2, 3, 0])])), 1);
    assert_eq!(acc.accumulate(&scraped(vec![histogram(5, vec![9, 9, 9, 9])])), 0);
    assert_eq!(acc.accumulate(&scraped(vec![histogram(20, vec![2, 4, 6, 1])])), 1);

    match &acc.collect()[0].data {
        MetricData::Histogram(h) => {
            assert_eq!(h.data_points.len(), 1);
            assert_eq!(h.data_points[0].count, 13);
            assert_eq!(h.data_points[0].timestamp, Timestamp(20));
        }
        other => panic!("Expected histogram, got {:?}", other.kind()),
    }
}

// ============================================================================
// Summary Tests
// ============================================================================

#[test]
fn test_summary_staleness() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let summary = |ts: u64, count: u64| {
        Metric::summary(
            "rpc.duration",
            vec![SummaryDataPoint::new(host_labels(), Timestamp(ts), count, count as f64)
                .with_quantile(0.5, 0.1)
                .with_quantile(0.99, 0.9)],
        )
    };

    assert_eq!(acc.accumulate(&scraped(vec![summary(100, 1)])), 1);
    assert_eq!(acc.accumulate(&scraped(vec![summary(99, 2)])), 0);
    assert_eq!(acc.accumulate(&scraped(vec![summary(100, 3)])), 1);

    match &acc.collect()[0].data {
        MetricData::Summary(s) => {
            assert_eq!(s.data_points[0].count, 3);
            assert_eq!(s.data_points[0].quantile_values.len(), 2);
        }
        other => panic!("Expected summary, got {:?}", other.kind()),
    }
}

// ============================================================================
// Identity Tests
// ============================================================================

#[test]
fn test_cross_kind_isolation() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let point = NumberDataPoint::new(host_labels(), Timestamp(10), 5i64);

    let gauge = Metric::gauge("requests", vec![point.clone()]);
    let sum = Metric::sum("requests", Temporality::Cumulative, true, vec![point]);

    assert_ne!(
        SignatureEncoder::for_metric("scraper", &gauge, &host_labels()),
        SignatureEncoder::for_metric("scraper", &sum, &host_labels())
    );

    assert_eq!(acc.accumulate(&scraped(vec![gauge, sum])), 2);

    let mut kinds: Vec<MetricKind> = acc.collect().iter().map(Metric::kind).collect();
    kinds.sort_by_key(|k| k.as_str());
    assert_eq!(kinds, vec![MetricKind::Gauge, MetricKind::Sum]);
}

#[test]
fn test_scopes_tracked_independently() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let batch = ResourceMetrics::new()
        .with_scope(InstrumentationScope::new("hostmetrics"), vec![cpu_gauge(1, 1.0)])
        .with_scope(InstrumentationScope::new("kubeletstats"), vec![cpu_gauge(1, 2.0)]);

    assert_eq!(acc.accumulate(&batch), 2);

    let mut scoped: Vec<(String, NumberValue)> = acc
        .collect_scoped()
        .into_iter()
        .map(|(scope, metric)| (scope.name, number_value(&metric)))
        .collect();
    scoped.sort_by(|a, b| a.0.cmp(&b.0));

    assert_eq!(
        scoped,
        vec![
            ("hostmetrics".to_string(), NumberValue::Double(1.0)),
            ("kubeletstats".to_string(), NumberValue::Double(2.0)),
        ]
    );
}

// ============================================================================
// Expiration Tests
// ============================================================================

#[test]
fn test_expiration_no_resurrection() {
    let (acc, clock) = accumulator(Duration::from_secs(1));

    acc.accumulate(&scraped(vec![cpu_gauge(100, 10.0)]));
    clock.advance(Duration::from_secs(2));

    assert!(acc.collect().is_empty());
    assert!(acc.is_empty());
    assert!(acc.collect().is_empty());

    // A fresh accumulate recreates the entry from scratch, even with an old point
    assert_eq!(acc.accumulate(&scraped(vec![cpu_gauge(1, 1.0)])), 1);
    assert_eq!(number_value(&acc.collect()[0]), NumberValue::Double(1.0));
}

#[test]
fn test_partial_expiration() {
    let (acc, clock) = accumulator(Duration::from_secs(60));

    acc.accumulate(&scraped(vec![Metric::gauge(
        "old",
        vec![NumberDataPoint::new(LabelSet::empty(), Timestamp(1), 1.0)],
    )]));
    clock.advance(Duration::from_secs(45));
    acc.accumulate(&scraped(vec![Metric::gauge(
        "fresh",
        vec![NumberDataPoint::new(LabelSet::empty(), Timestamp(1), 1.0)],
    )]));
    clock.advance(Duration::from_secs(30));

    let names: Vec<String> = acc.collect().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["fresh".to_string()]);
    assert_eq!(acc.len(), 1);
}

#[test]
fn test_idempotent_collection() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let metrics: Vec<Metric> = (0..50)
        .map(|i| {
            Metric::gauge(
                format!("gauge.{}", i),
                vec![NumberDataPoint::new(LabelSet::empty(), Timestamp(i), i as f64)],
            )
        })
        .collect();
    acc.accumulate(&scraped(metrics));

    let sort = |mut metrics: Vec<Metric>| {
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    };

    let first = sort(acc.collect());
    let second = sort(acc.collect());
    assert_eq!(first.len(), 50);
    assert_eq!(first, second);
}

#[test]
fn test_every_collected_metric_has_one_datapoint() {
    let (acc, _clock) = accumulator(Duration::from_secs(300));
    let points: Vec<NumberDataPoint> = (0..20)
        .map(|i| {
            NumberDataPoint::new(
                LabelSet::from_pairs([("cpu", i as i64)]),
                Timestamp(100),
                i as f64,
            )
        })
        .collect();

    assert_eq!(acc.accumulate(&scraped(vec![Metric::gauge("cpu.time", points)])), 20);

    let collected = acc.collect();
    assert_eq!(collected.len(), 20);
    assert!(collected.iter().all(|m| m.data.data_point_count() == 1));
}
