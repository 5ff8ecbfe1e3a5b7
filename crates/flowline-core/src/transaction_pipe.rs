//! The `TRANSACTION` update family's typed pipe, built around the schema
//! matcher instead of a single-payload decoder.

use async_trait::async_trait;

use crate::filter::Filters;
use crate::instruction::NestedInstruction;
use crate::schema::{matches, InstructionDecoderCollection, MatchFn, TransactionSchema};
use crate::transaction::TransactionMetadata;
use crate::update::Carrier;

/// A whole transaction's reconstructed instruction forest, handed to a
/// [`TransactionPipe`]'s processor once its schema has matched.
#[derive(Clone, Debug)]
pub struct ParsedTransaction {
    pub metadata: TransactionMetadata,
    pub instructions: Vec<NestedInstruction>,
}

#[async_trait]
pub trait TransactionProcessor: Send + Sync + 'static {
    async fn process(&self, transaction: ParsedTransaction) -> crate::error::PipelineResult<()>;
}

/// Bundles a [`TransactionSchema`] (or a caller-supplied override matcher)
/// with a processor invoked once per matching transaction.
pub struct TransactionPipe<T: InstructionDecoderCollection, P> {
    pub filters: Filters,
    pub schema: TransactionSchema<T>,
    pub match_fn: Option<MatchFn<T>>,
    pub processor: P,
}

impl<T: InstructionDecoderCollection, P> TransactionPipe<T, P> {
    /// Builds a pipe that accepts every update (no filters) with no custom
    /// match-function override.
    pub fn new(schema: TransactionSchema<T>, processor: P) -> Self {
        Self { filters: Filters::default(), schema, match_fn: None, processor }
    }

    pub fn with_filters(filters: Filters, schema: TransactionSchema<T>, processor: P) -> Self {
        Self { filters, schema, match_fn: None, processor }
    }
}

#[async_trait]
pub trait TransactionPipes: Send + Sync {
    async fn run(&self, carrier: &Carrier, metadata: &TransactionMetadata, roots: &[NestedInstruction]) -> crate::error::PipelineResult<()>;
}

#[async_trait]
impl<T, P> TransactionPipes for TransactionPipe<T, P>
where
    T: InstructionDecoderCollection,
    P: TransactionProcessor,
{
    async fn run(&self, carrier: &Carrier, metadata: &TransactionMetadata, roots: &[NestedInstruction]) -> crate::error::PipelineResult<()> {
        if !self.filters.accept_all(carrier).await {
            return Ok(());
        }
        let matched = match &self.match_fn {
            Some(custom) => custom(&self.schema, roots),
            None => matches(&self.schema, roots),
        };
        if !matched {
            return Ok(());
        }
        self.processor
            .process(ParsedTransaction { metadata: metadata.clone(), instructions: roots.to_vec() })
            .await
    }
}
