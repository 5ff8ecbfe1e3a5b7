//! Error taxonomy for the pipeline engine.

use thiserror::Error;

use crate::identifiers::SourceId;

/// Errors surfaced by [`crate::pipeline::Pipeline`] and the types it is built
/// from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("data source {0} failed to start: {1}")]
    DatasourceStartup(SourceId, String),

    #[error("data source {0} ended unexpectedly: {1}")]
    DatasourceFailure(SourceId, String),

    #[error("dispatch channel closed while a datasource was still sending updates")]
    ChannelClosed,

    #[error("processor {name} failed: {source}")]
    Processor {
        name: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("metrics sink error: {0}")]
    Metrics(#[from] flowline_metrics::MetricsError),

    #[error("builder is missing a required component: {0}")]
    Incomplete(&'static str),
}

/// Convenience alias used throughout the crate.
pub type PipelineResult<T> = Result<T, Error>;
