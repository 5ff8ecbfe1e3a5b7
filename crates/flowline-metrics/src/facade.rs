use async_trait::async_trait;

use crate::MetricsSink;

/// A sink that forwards every call to the `metrics` crate's global recorder.
///
/// This is the sink most embedders reach for: it takes no opinion on the
/// actual telemetry backend (Prometheus, StatsD, a test recorder, ...) and
/// simply emits through `metrics::{gauge,counter,histogram}!`, exactly like
/// the teacher's codebase does in its own instrumented hot paths. Installing
/// an exporter (e.g. `metrics-exporter-prometheus`) remains the embedding
/// binary's responsibility.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacadeSink;

#[async_trait]
impl MetricsSink for FacadeSink {
    fn gauge_set(&self, name: &'static str, value: f64) {
        metrics::gauge!(name).set(value);
    }

    fn counter_add(&self, name: &'static str, value: u64) {
        metrics::counter!(name).increment(value);
    }

    fn histogram_record(&self, name: &'static str, value: f64) {
        metrics::histogram!(name).record(value);
    }
}
