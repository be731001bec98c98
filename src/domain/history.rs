//! The user's previously registered records, as last reported by the service.

use crate::domain::session::BearerToken;
use crate::error::ClientResult;
use crate::infra::ledger::{FileRecord, LedgerApi};

#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    records: Vec<FileRecord>,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached list with the service's, newest first.
    /// On failure the previous list is kept.
    pub async fn refresh<A: LedgerApi + ?Sized>(
        &mut self,
        api: &A,
        token: &BearerToken,
    ) -> ClientResult<&[FileRecord]> {
        let mut records = api.list_files(token).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        self.records = records;
        Ok(&self.records)
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
