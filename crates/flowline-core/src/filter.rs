//! Filters gate whether a typed pipe even reaches its decoder.

use async_trait::async_trait;

use crate::update::Carrier;

/// A predicate evaluated against the raw carrier before decoding. Returning
/// `false` skips the pipe for this update without invoking its decoder or
/// processor.
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    async fn accept(&self, carrier: &Carrier) -> bool;
}

/// Accepts everything; the default when a pipe is built without filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl Filter for AllowAll {
    async fn accept(&self, _carrier: &Carrier) -> bool {
        true
    }
}

/// Accepts only updates produced by one named source.
#[derive(Clone, Debug)]
pub struct SourceIdFilter(pub crate::identifiers::SourceId);

#[async_trait]
impl Filter for SourceIdFilter {
    async fn accept(&self, carrier: &Carrier) -> bool {
        carrier.source_id == self.0
    }
}

/// An ordered list of filters; all must accept for the pipe to run.
#[derive(Default)]
pub struct Filters(pub Vec<Box<dyn Filter>>);

impl Filters {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self(filters)
    }

    pub async fn accept_all(&self, carrier: &Carrier) -> bool {
        for filter in &self.0 {
            if !filter.accept(carrier).await {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::Update;
    use crate::deletion::AccountDeletion;
    use crate::identifiers::Pubkey;

    fn carrier(source: &str) -> Carrier {
        Carrier {
            source_id: source.to_string(),
            update: Update::AccountDeletion(AccountDeletion { pubkey: Pubkey::default(), slot: 0 }),
        }
    }

    #[tokio::test]
    async fn empty_filter_list_accepts_everything() {
        assert!(Filters::default().accept_all(&carrier("a")).await);
    }

    #[tokio::test]
    async fn source_id_filter_rejects_other_sources() {
        let filters = Filters::new(vec![Box::new(SourceIdFilter("a".to_string()))]);
        assert!(filters.accept_all(&carrier("a")).await);
        assert!(!filters.accept_all(&carrier("b")).await);
    }
}
