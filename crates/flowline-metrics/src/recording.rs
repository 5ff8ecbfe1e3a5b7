use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::MetricsSink;

/// An in-memory sink that records the last gauge value, running counter
/// total, and all histogram observations per metric name.
///
/// Exists purely for tests and demos; it is not meant to back a real
/// deployment (see `SPEC_FULL.md` §1: concrete metric sinks are out of
/// scope for the pipeline itself).
#[derive(Debug, Default)]
pub struct RecordingSink {
    gauges: Mutex<HashMap<&'static str, f64>>,
    counters: Mutex<HashMap<&'static str, u64>>,
    histograms: Mutex<HashMap<&'static str, Vec<f64>>>,
    flush_count: Mutex<u64>,
}

impl RecordingSink {
    pub fn gauge(&self, name: &'static str) -> Option<f64> {
        self.gauges.lock().unwrap().get(name).copied()
    }

    pub fn counter(&self, name: &'static str) -> u64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn histogram(&self, name: &'static str) -> Vec<f64> {
        self.histograms
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn flush_count(&self) -> u64 {
        *self.flush_count.lock().unwrap()
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn flush(&self) -> crate::MetricsResult<()> {
        *self.flush_count.lock().unwrap() += 1;
        Ok(())
    }

    fn gauge_set(&self, name: &'static str, value: f64) {
        self.gauges.lock().unwrap().insert(name, value);
    }

    fn counter_add(&self, name: &'static str, value: u64) {
        *self.counters.lock().unwrap().entry(name).or_insert(0) += value;
    }

    fn histogram_record(&self, name: &'static str, value: f64) {
        self.histograms.lock().unwrap().entry(name).or_default().push(value);
    }
}
