//! Locally cached view of the user's remaining credit balance.
//!
//! The service owns the real balance. This cache exists for gating the registration action
//! and for display, and is overwritten whenever an authoritative value arrives.

use tracing::debug;

use crate::domain::session::{Identity, Session};
use crate::error::ClientResult;
use crate::infra::ledger::LedgerApi;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditLedgerView {
    cached: Option<u32>,
}

impl CreditLedgerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache from an identity that was just fetched.
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            cached: Some(identity.credits),
        }
    }

    /// Last known balance; `None` until the first identity fetch.
    pub fn current(&self) -> Option<u32> {
        self.cached
    }

    /// UX gate for the registration action. Unknown balance counts as "no credits".
    pub fn can_register(&self) -> bool {
        matches!(self.cached, Some(n) if n > 0)
    }

    /// Re-fetches the identity and overwrites both the session's identity and the cache.
    pub async fn refresh<A: LedgerApi + ?Sized>(
        &mut self,
        api: &A,
        session: &mut Session,
    ) -> ClientResult<u32> {
        let identity = Identity::from(api.identity(&session.token).await?);
        session.identity = identity;
        self.apply_authoritative(session.identity.credits);
        Ok(session.identity.credits)
    }

    /// Overwrites the cache with a server-confirmed value.
    pub fn apply_authoritative(&mut self, credits: u32) {
        if self.cached != Some(credits) {
            debug!(previous = ?self.cached, current = credits, "credit cache reconciled");
        }
        self.cached = Some(credits);
    }

    /// Applied once per server-confirmed registration. An unknown balance stays unknown.
    pub(crate) fn optimistic_decrement(&mut self) {
        if let Some(n) = self.cached.as_mut() {
            *n = n.saturating_sub(1);
        }
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }
}
