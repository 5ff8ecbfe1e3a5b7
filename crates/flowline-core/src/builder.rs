//! Fluent configuration of a [`Pipeline`].

use std::sync::Arc;
use std::time::Duration;

use crate::account::AccountPipes;
use crate::block_details::BlockDetailsPipes;
use crate::datasource::Datasource;
use crate::deletion::DeletionPipes;
use crate::error::{Error, PipelineResult};
use crate::identifiers::{generate_source_id, SourceId};
use crate::instruction::InstructionPipes;
use crate::pipeline::{Pipeline, ShutdownStrategy, DEFAULT_CHANNEL_BUFFER, DEFAULT_METRICS_FLUSH_INTERVAL};
use crate::transaction_pipe::TransactionPipes;

/// Builds a [`Pipeline`] option by option. Defaults: buffer size 1000, flush
/// interval 5 seconds, strategy `process-pending`, metrics = empty.
#[derive(Default)]
pub struct PipelineBuilder {
    sources: Vec<(SourceId, Arc<dyn Datasource>)>,
    account_pipes: Vec<Arc<dyn AccountPipes>>,
    instruction_pipes: Vec<Arc<dyn InstructionPipes>>,
    transaction_pipes: Vec<Arc<dyn TransactionPipes>>,
    deletion_pipes: Vec<Arc<dyn DeletionPipes>>,
    block_details_pipes: Vec<Arc<dyn BlockDetailsPipes>>,
    metrics: Option<flowline_metrics::MetricsCollection>,
    shutdown_strategy: Option<ShutdownStrategy>,
    channel_buffer_size: Option<usize>,
    metrics_flush_interval: Option<Duration>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a data source under `source_id`, or a generated id if
    /// `source_id` is `None`.
    pub fn source(mut self, source_id: Option<SourceId>, source: Arc<dyn Datasource>) -> Self {
        self.sources.push((source_id.unwrap_or_else(generate_source_id), source));
        self
    }

    pub fn account_pipe(mut self, pipe: Arc<dyn AccountPipes>) -> Self {
        self.account_pipes.push(pipe);
        self
    }

    pub fn instruction_pipe(mut self, pipe: Arc<dyn InstructionPipes>) -> Self {
        self.instruction_pipes.push(pipe);
        self
    }

    pub fn transaction_pipe(mut self, pipe: Arc<dyn TransactionPipes>) -> Self {
        self.transaction_pipes.push(pipe);
        self
    }

    pub fn deletion_pipe(mut self, pipe: Arc<dyn DeletionPipes>) -> Self {
        self.deletion_pipes.push(pipe);
        self
    }

    pub fn block_details_pipe(mut self, pipe: Arc<dyn BlockDetailsPipes>) -> Self {
        self.block_details_pipes.push(pipe);
        self
    }

    pub fn metrics(mut self, metrics: flowline_metrics::MetricsCollection) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics_flush_interval(mut self, interval: Duration) -> Self {
        self.metrics_flush_interval = Some(interval);
        self
    }

    pub fn shutdown_strategy(mut self, strategy: ShutdownStrategy) -> Self {
        self.shutdown_strategy = Some(strategy);
        self
    }

    pub fn channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = Some(size);
        self
    }

    /// Assembles the [`Pipeline`]. Fails only if no source was registered;
    /// every other option defaults per the builder's documented values.
    pub fn build(self) -> PipelineResult<Pipeline> {
        if self.sources.is_empty() {
            return Err(Error::Incomplete("at least one data source"));
        }

        Ok(Pipeline {
            sources: self.sources,
            account_pipes: self.account_pipes,
            instruction_pipes: self.instruction_pipes,
            transaction_pipes: self.transaction_pipes,
            deletion_pipes: self.deletion_pipes,
            block_details_pipes: self.block_details_pipes,
            metrics: self.metrics.unwrap_or_else(flowline_metrics::MetricsCollection::empty),
            shutdown_strategy: self.shutdown_strategy.unwrap_or_default(),
            channel_buffer_size: self.channel_buffer_size.unwrap_or(DEFAULT_CHANNEL_BUFFER),
            metrics_flush_interval: self.metrics_flush_interval.unwrap_or(DEFAULT_METRICS_FLUSH_INTERVAL),
        })
    }
}
