//! Account snapshots, their decoder contract, and the account pipe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filter::Filters;
use crate::identifiers::Pubkey;
use crate::update::Carrier;

/// A point-in-time snapshot of an on-chain account.
///
/// Equality and identity are defined by [`pubkey`](AccountRecord::pubkey)
/// alone; two records for the same key at different slots are still "the
/// same account" for matching purposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountRecord {
    pub pubkey: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
    pub rent_epoch: u64,
    pub slot: u64,
    pub write_version: u64,
}

impl PartialEq for AccountRecord {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey == other.pubkey
    }
}
impl Eq for AccountRecord {}

/// Decodes the raw bytes of an [`AccountRecord`] into a typed payload `T`.
///
/// Returns `None` when the account doesn't belong to this decoder (wrong
/// owner, unrecognized discriminator, ...); the pipe skips the account
/// without error in that case.
pub trait AccountDecoder: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn decode_account(&self, account: &AccountRecord) -> Option<Self::Output>;
}

/// An [`AccountRecord`] paired with its decoded payload.
#[derive(Clone, Debug)]
pub struct DecodedAccount<T> {
    pub pubkey: Pubkey,
    pub data: T,
}

/// Consumes a decoded account update.
#[async_trait]
pub trait AccountProcessor: Send + Sync + 'static {
    type Input: Send + Sync + 'static;

    async fn process(&self, account: DecodedAccount<Self::Input>) -> crate::error::PipelineResult<()>;
}

/// Bundles a filter set, a decoder, and a processor behind a single
/// type-erased contract so heterogeneous `AccountPipe<D, P>` instances can
/// live in one [`AccountPipes`] collection.
pub struct AccountPipe<D, P> {
    pub filters: Filters,
    pub decoder: D,
    pub processor: P,
}

impl<D, P> AccountPipe<D, P> {
    /// Builds a pipe that accepts every update (no filters).
    pub fn new(decoder: D, processor: P) -> Self {
        Self::with_filters(Filters::default(), decoder, processor)
    }

    pub fn with_filters(filters: Filters, decoder: D, processor: P) -> Self {
        Self { filters, decoder, processor }
    }
}

#[async_trait]
pub trait AccountPipes: Send + Sync {
    async fn run(&self, carrier: &Carrier, account: &AccountRecord) -> crate::error::PipelineResult<()>;
}

#[async_trait]
impl<D, P> AccountPipes for AccountPipe<D, P>
where
    D: AccountDecoder<Output = P::Input>,
    P: AccountProcessor,
{
    async fn run(&self, carrier: &Carrier, account: &AccountRecord) -> crate::error::PipelineResult<()> {
        if !self.filters.accept_all(carrier).await {
            return Ok(());
        }
        let Some(decoded) = self.decoder.decode_account(account) else {
            return Ok(());
        };
        self.processor
            .process(DecodedAccount { pubkey: account.pubkey, data: decoded })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pubkey: Pubkey) -> AccountRecord {
        AccountRecord {
            pubkey,
            owner: Pubkey::default(),
            lamports: 1,
            data: vec![],
            executable: false,
            rent_epoch: 0,
            slot: 10,
            write_version: 0,
        }
    }

    #[test]
    fn equality_ignores_everything_but_pubkey() {
        let pk = Pubkey::new([7u8; 32]);
        let mut a = sample(pk);
        let mut b = sample(pk);
        a.slot = 1;
        b.slot = 2;
        b.lamports = 999;
        assert_eq!(a, b);
    }

    #[test]
    fn different_pubkeys_are_unequal() {
        let a = sample(Pubkey::new([1u8; 32]));
        let b = sample(Pubkey::new([2u8; 32]));
        assert_ne!(a, b);
    }
}
