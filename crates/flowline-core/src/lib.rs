//! Streaming pipeline framework for processing on-chain account and
//! transaction events from pluggable data sources into typed,
//! user-defined processors.
//!
//! The engine ([`pipeline::Pipeline`], assembled via
//! [`builder::PipelineBuilder`]) fans out heterogeneous updates from
//! multiple concurrent data sources into a bounded queue, routes each
//! update through a decoder → filter → processor pipe, reconstructs the
//! nested structure of a transaction's instructions from its flat
//! pre-order log, and manages cooperative shutdown.

pub mod account;
pub mod block_details;
pub mod builder;
pub mod datasource;
pub mod deletion;
pub mod error;
pub mod filter;
pub mod identifiers;
pub mod instruction;
pub mod log_extractor;
pub mod pipeline;
pub mod processor;
pub mod schema;
pub mod transaction;
pub mod transaction_pipe;
pub mod update;

pub use builder::PipelineBuilder;
pub use error::{Error, PipelineResult};
pub use pipeline::{Pipeline, ShutdownStrategy};
pub use update::{Carrier, Update};
