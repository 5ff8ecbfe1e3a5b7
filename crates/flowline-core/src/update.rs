//! The tagged union carried on the dispatch channel, and the envelope that
//! pairs it with its originating source.

use crate::account::AccountRecord;
use crate::block_details::BlockDetails;
use crate::deletion::AccountDeletion;
use crate::identifiers::SourceId;
use crate::transaction::TransactionRecord;

/// One raw update, tagged by family.
#[derive(Clone, Debug)]
pub enum Update {
    Account(AccountRecord),
    Transaction(TransactionRecord),
    AccountDeletion(AccountDeletion),
    BlockDetails(BlockDetails),
}

impl Update {
    /// The family tag used for routing and metrics, e.g. `"ACCOUNT"`.
    pub fn family(&self) -> &'static str {
        match self {
            Update::Account(_) => "ACCOUNT",
            Update::Transaction(_) => "TRANSACTION",
            Update::AccountDeletion(_) => "ACCOUNT_DELETION",
            Update::BlockDetails(_) => "BLOCK_DETAILS",
        }
    }
}

/// An [`Update`] tagged with the id of the source that produced it. This is
/// what actually travels over the carrier channel.
#[derive(Clone, Debug)]
pub struct Carrier {
    pub source_id: SourceId,
    pub update: Update,
}
