use async_trait::async_trait;

use crate::MetricsSink;

/// A sink that discards everything. Used as the builder's default so a
/// pipeline that hasn't been told about a metrics backend still runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl MetricsSink for NoopSink {
    fn gauge_set(&self, _name: &'static str, _value: f64) {}

    fn counter_add(&self, _name: &'static str, _value: u64) {}

    fn histogram_record(&self, _name: &'static str, _value: f64) {}
}
