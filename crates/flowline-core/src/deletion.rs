//! The `ACCOUNT_DELETION` update family.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::Filters;
use crate::identifiers::Pubkey;
use crate::update::Carrier;

/// Reports that an account no longer exists as of `slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeletion {
    pub pubkey: Pubkey,
    pub slot: u64,
}

pub trait DeletionDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn decode_deletion(&self, deletion: &AccountDeletion) -> Option<Self::Output>;
}

#[async_trait]
pub trait DeletionProcessor: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    async fn process(&self, deletion: AccountDeletion, decoded: Self::Input) -> crate::error::PipelineResult<()>;
}

pub struct DeletionPipe<D, P> {
    pub filters: Filters,
    pub decoder: D,
    pub processor: P,
}

impl<D, P> DeletionPipe<D, P> {
    /// Builds a pipe that accepts every update (no filters).
    pub fn new(decoder: D, processor: P) -> Self {
        Self::with_filters(Filters::default(), decoder, processor)
    }

    pub fn with_filters(filters: Filters, decoder: D, processor: P) -> Self {
        Self { filters, decoder, processor }
    }
}

#[async_trait]
pub trait DeletionPipes: Send + Sync {
    async fn run(&self, carrier: &Carrier, deletion: &AccountDeletion) -> crate::error::PipelineResult<()>;
}

#[async_trait]
impl<D, P> DeletionPipes for DeletionPipe<D, P>
where
    D: DeletionDecoder<Output = P::Input>,
    P: DeletionProcessor,
{
    async fn run(&self, carrier: &Carrier, deletion: &AccountDeletion) -> crate::error::PipelineResult<()> {
        if !self.filters.accept_all(carrier).await {
            return Ok(());
        }
        let Some(decoded) = self.decoder.decode_deletion(deletion) else {
            return Ok(());
        };
        self.processor.process(*deletion, decoded).await
    }
}
