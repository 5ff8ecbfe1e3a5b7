//! The `BLOCK_DETAILS` update family.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::Filters;
use crate::identifiers::Hash;
use crate::update::Carrier;

/// Metadata about a finalized (or otherwise notified) block, independent of
/// any one transaction within it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDetails {
    pub slot: u64,
    pub blockhash: Hash,
    pub parent_slot: u64,
    pub block_time: Option<i64>,
    pub transaction_count: u64,
}

pub trait BlockDetailsDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn decode_block_details(&self, block: &BlockDetails) -> Option<Self::Output>;
}

#[async_trait]
pub trait BlockDetailsProcessor: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    async fn process(&self, block: BlockDetails, decoded: Self::Input) -> crate::error::PipelineResult<()>;
}

pub struct BlockDetailsPipe<D, P> {
    pub filters: Filters,
    pub decoder: D,
    pub processor: P,
}

impl<D, P> BlockDetailsPipe<D, P> {
    /// Builds a pipe that accepts every update (no filters).
    pub fn new(decoder: D, processor: P) -> Self {
        Self::with_filters(Filters::default(), decoder, processor)
    }

    pub fn with_filters(filters: Filters, decoder: D, processor: P) -> Self {
        Self { filters, decoder, processor }
    }
}

#[async_trait]
pub trait BlockDetailsPipes: Send + Sync {
    async fn run(&self, carrier: &Carrier, block: &BlockDetails) -> crate::error::PipelineResult<()>;
}

#[async_trait]
impl<D, P> BlockDetailsPipes for BlockDetailsPipe<D, P>
where
    D: BlockDetailsDecoder<Output = P::Input>,
    P: BlockDetailsProcessor,
{
    async fn run(&self, carrier: &Carrier, block: &BlockDetails) -> crate::error::PipelineResult<()> {
        if !self.filters.accept_all(carrier).await {
            return Ok(());
        }
        let Some(decoded) = self.decoder.decode_block_details(block) else {
            return Ok(());
        };
        self.processor.process(block.clone(), decoded).await
    }
}
