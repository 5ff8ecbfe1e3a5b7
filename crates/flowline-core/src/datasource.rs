//! The data-source contract and the carrier channel sources publish into.

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineResult;
use crate::identifiers::SourceId;
use crate::update::{Carrier, Update};

/// Which update tags a data source may ever emit. Used only for
/// documentation/introspection; the engine does not enforce it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateTag {
    Account,
    Transaction,
    AccountDeletion,
    BlockDetails,
}

/// A producer of updates. Runs until `cancellation` fires or it hits an
/// unrecoverable error; responsible for its own polling cadence, retry, and
/// slot-deduplication.
#[async_trait]
pub trait Datasource: Send + Sync + 'static {
    async fn consume(
        &self,
        source_id: SourceId,
        sender: Sender<Carrier>,
        cancellation: CancellationToken,
        metrics: flowline_metrics::MetricsCollection,
    ) -> PipelineResult<()>;

    fn update_tags(&self) -> Vec<UpdateTag>;
}

/// An in-memory datasource that replays a fixed list of updates, one per
/// loop tick, then exits. Exists for tests and demos.
#[cfg(any(test, feature = "test-util"))]
pub struct TestDatasource {
    pub updates: Vec<Update>,
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl Datasource for TestDatasource {
    async fn consume(
        &self,
        source_id: SourceId,
        sender: Sender<Carrier>,
        cancellation: CancellationToken,
        _metrics: flowline_metrics::MetricsCollection,
    ) -> PipelineResult<()> {
        for update in &self.updates {
            if cancellation.is_cancelled() {
                return Ok(());
            }
            if sender
                .send(Carrier { source_id: source_id.clone(), update: update.clone() })
                .await
                .is_err()
            {
                return Ok(());
            }
        }
        Ok(())
    }

    fn update_tags(&self) -> Vec<UpdateTag> {
        vec![UpdateTag::Account, UpdateTag::Transaction, UpdateTag::AccountDeletion, UpdateTag::BlockDetails]
    }
}
