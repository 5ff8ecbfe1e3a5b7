//! Metrics sink abstraction used by the pipeline engine.
//!
//! The engine never talks to a concrete metrics backend directly; it only
//! ever calls through [`MetricsSink`]. This crate owns that contract, a
//! fan-out [`MetricsCollection`] that multiplexes calls to every registered
//! sink, a [`FacadeSink`] that forwards to whatever recorder the embedding
//! binary installs via the `metrics` crate, and test-only sinks used across
//! the workspace's integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod facade;
mod noop;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;

pub use facade::FacadeSink;
pub use noop::NoopSink;
#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingSink;

/// Errors a [`MetricsSink`] may surface from its lifecycle hooks.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to initialise metrics sink: {0}")]
    Init(String),
    #[error("failed to flush metrics sink: {0}")]
    Flush(String),
    #[error("failed to shut down metrics sink: {0}")]
    Shutdown(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Canonical metric names the pipeline engine emits.
///
/// Kept as associated constants rather than an enum so sinks can match on
/// `&str` without an extra conversion, the same way the engine's own dispatch
/// loop names them inline.
pub mod names {
    pub const UPDATES_RECEIVED: &str = "updates_received";
    pub const UPDATES_PROCESSED: &str = "updates_processed";
    pub const UPDATES_SUCCESSFUL: &str = "updates_successful";
    pub const UPDATES_FAILED: &str = "updates_failed";
    pub const UPDATES_QUEUED: &str = "updates_queued";
    pub const UPDATES_PROCESS_TIME_NANOSECONDS: &str = "updates_process_time_nanoseconds";
    pub const UPDATES_PROCESS_TIME_MILLISECONDS: &str = "updates_process_time_milliseconds";
    pub const ACCOUNT_UPDATES_PROCESSED: &str = "account_updates_processed";
    pub const TRANSACTION_UPDATES_PROCESSED: &str = "transaction_updates_processed";
    pub const ACCOUNT_DELETIONS_PROCESSED: &str = "account_deletions_processed";
    pub const BLOCK_DETAILS_PROCESSED: &str = "block_details_processed";
}

/// A single telemetry backend the engine can push gauges, counters, and
/// histograms into.
///
/// Implementations are expected to be cheap to clone (an `Arc` around a
/// handle, typically) since the engine holds one [`MetricsCollection`] for
/// the lifetime of `run`.
#[async_trait]
pub trait MetricsSink: Send + Sync + std::fmt::Debug {
    /// Called once before the dispatch loop starts. May fail; a failure here
    /// aborts pipeline startup.
    async fn initialize(&self) -> MetricsResult<()> {
        Ok(())
    }

    /// Called on every metrics-flush tick and once more during shutdown.
    async fn flush(&self) -> MetricsResult<()> {
        Ok(())
    }

    /// Called once during shutdown, after the final flush.
    async fn shutdown(&self) -> MetricsResult<()> {
        Ok(())
    }

    /// Set a gauge to an absolute value.
    fn gauge_set(&self, name: &'static str, value: f64);

    /// Add a delta to a monotonic counter.
    fn counter_add(&self, name: &'static str, value: u64);

    /// Record an observation into a histogram.
    fn histogram_record(&self, name: &'static str, value: f64);
}

/// Fan-out to zero or more [`MetricsSink`] implementations.
///
/// Mirrors the teacher's `ConsensusMetricsWrapper` idea of one app-facing
/// handle hiding an arbitrary number of concrete backends; here it is
/// explicit rather than wrapping a single library type because the engine is
/// meant to be embeddable with any combination of sinks, including zero.
#[derive(Clone, Debug, Default)]
pub struct MetricsCollection {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl MetricsCollection {
    pub fn new(sinks: Vec<Arc<dyn MetricsSink>>) -> Self {
        Self { sinks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub async fn initialize(&self) -> MetricsResult<()> {
        for sink in &self.sinks {
            sink.initialize().await?;
        }
        Ok(())
    }

    /// Flushes every sink, logging (but not propagating) individual
    /// failures: a single bad sink must never take the others down with it.
    pub async fn flush(&self) {
        for sink in &self.sinks {
            if let Err(error) = sink.flush().await {
                tracing::warn!(?error, sink = ?sink, "metrics sink failed to flush");
            }
        }
    }

    pub async fn shutdown(&self) {
        for sink in &self.sinks {
            if let Err(error) = sink.shutdown().await {
                tracing::warn!(?error, sink = ?sink, "metrics sink failed to shut down");
            }
        }
    }

    pub fn gauge_set(&self, name: &'static str, value: f64) {
        for sink in &self.sinks {
            sink.gauge_set(name, value);
        }
    }

    pub fn counter_add(&self, name: &'static str, value: u64) {
        for sink in &self.sinks {
            sink.counter_add(name, value);
        }
    }

    pub fn histogram_record(&self, name: &'static str, value: f64) {
        for sink in &self.sinks {
            sink.histogram_record(name, value);
        }
    }
}
