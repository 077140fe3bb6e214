//! Timeseries signatures
//!
//! A signature identifies one logical timeseries across metric kind,
//! instrumentation scope, metric name and label set.
//!
//! Signature format: `<kind>*<scope>*<name>[*<label key>*<label value>]...`
//!
//! Examples:
//! - `Gauge*scraper*system.cpu*core*3*host*web01`
//! - `Sum*otlp*http.requests` (no labels)
//!
//! Labels are always written in sorted key order, so the order in which a
//! producer attached them never changes the signature.

use super::types::{LabelSet, Metric, MetricKind};

/// Separator between signature components
pub const SIGNATURE_SEPARATOR: char = '*';

/// Builds timeseries signatures used as aggregation store keys
pub struct SignatureEncoder;

impl SignatureEncoder {
    /// Encode the signature of one timeseries
    pub fn encode(
        kind: MetricKind,
        scope_name: &str,
        metric_name: &str,
        labels: &LabelSet,
    ) -> String {
        let kind_name = kind.as_str();
        let mut signature = String::with_capacity(
            kind_name.len() + scope_name.len() + metric_name.len() + 2 + labels.len() * 16,
        );

        signature.push_str(kind_name);
        signature.push(SIGNATURE_SEPARATOR);
        signature.push_str(scope_name);
        signature.push(SIGNATURE_SEPARATOR);
        signature.push_str(metric_name);

        // LabelSet iterates in sorted key order
        for (key, value) in labels.iter() {
            signature.push(SIGNATURE_SEPARATOR);
            signature.push_str(key);
            signature.push(SIGNATURE_SEPARATOR);
            signature.push_str(&value.as_string());
        }

        signature
    }

    /// Encode the signature of a datapoint of `metric` emitted by `scope_name`
    pub fn for_metric(scope_name: &str, metric: &Metric, labels: &LabelSet) -> String {
        Self::encode(metric.kind(), scope_name, &metric.name, labels)
    }
}
