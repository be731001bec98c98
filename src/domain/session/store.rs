//! Login/logout lifecycle and startup restore.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::session::{BearerToken, Identity, Session, TokenStore};
use crate::error::{ClientError, ClientResult};
use crate::infra::ledger::LedgerApi;

pub struct SessionStore<A: LedgerApi> {
    api: Arc<A>,
    tokens: Arc<dyn TokenStore>,
}

impl<A: LedgerApi> SessionStore<A> {
    pub fn new(api: Arc<A>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { api, tokens }
    }

    /// Exchanges credentials for a token, resolves the identity, then persists the token.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let email = validate_credentials(email, password)?;

        let token = self.api.login(&email, password).await?;
        // Persist only a token that resolved; a failed attempt leaves any stored session alone.
        let session = self.resolve(token).await?;
        if let Err(e) = self.tokens.save(&session.token) {
            warn!(error = %e, "failed to persist session token; session will not survive restart");
        }
        info!(email = %session.email(), credits = session.identity.credits, "logged in");
        Ok(session)
    }

    /// Creates an account. Never establishes a session.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<()> {
        let email = validate_credentials(email, password)?;
        self.api.create_account(&email, password).await?;
        info!(email = %email, "account created");
        Ok(())
    }

    /// Resumes a previously persisted session, if the token still resolves.
    ///
    /// A rejected token is discarded. A transport failure keeps the token on disk so a later
    /// run can try again, but still yields `None` for this one.
    pub async fn restore(&self) -> Option<Session> {
        let token = match self.tokens.load() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "persisted token unreadable; discarding");
                self.discard_token();
                return None;
            }
        };

        match self.resolve(token).await {
            Ok(session) => {
                info!(email = %session.email(), "restored persisted session");
                Some(session)
            }
            Err(ClientError::ServiceUnavailable(reason)) => {
                warn!(%reason, "could not reach identity service; starting unauthenticated");
                None
            }
            Err(e) => {
                warn!(error = %e, "persisted session rejected; discarding token");
                self.discard_token();
                None
            }
        }
    }

    /// Fetches the identity behind `token`.
    pub async fn resolve(&self, token: BearerToken) -> ClientResult<Session> {
        let identity = self.api.identity(&token).await?;
        Ok(Session::new(token, Identity::from(identity)))
    }

    /// Discards the persisted token. Always succeeds.
    pub fn logout(&self) {
        self.discard_token();
    }

    fn discard_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to remove persisted session token");
        }
    }
}

/// Rejects blank credentials before any request is made. Returns the trimmed email.
fn validate_credentials(email: &str, password: &str) -> ClientResult<String> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ClientError::Validation(
            "Email and password are required.".into(),
        ));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::MemoryTokenStore;
    use crate::testing::FakeLedger;

    fn store_with(fake: Arc<FakeLedger>, tokens: Arc<MemoryTokenStore>) -> SessionStore<FakeLedger> {
        SessionStore::new(fake, tokens)
    }

    #[tokio::test]
    async fn login_persists_token_and_fetches_identity() {
        let fake = Arc::new(FakeLedger::with_account("a@x.com", "p", 3));
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_with(fake.clone(), tokens.clone());

        let session = store.login("a@x.com", "p").await.unwrap();

        assert_eq!(session.identity.credits, 3);
        assert_eq!(session.email(), "a@x.com");
        assert_eq!(tokens.load().unwrap(), Some(session.token.clone()));
        assert_eq!(fake.calls().identity, 1);
    }

    #[tokio::test]
    async fn unresolvable_login_keeps_previous_token() {
        let fake = Arc::new(FakeLedger::with_account("a@x.com", "p", 3));
        let previous = fake.issue_token("a@x.com");
        let tokens = Arc::new(MemoryTokenStore::with_token(previous.clone()));
        let store = store_with(fake.clone(), tokens.clone());
        fake.expire_tokens();

        let err = store.login("a@x.com", "p").await.unwrap_err();
        assert_eq!(err, ClientError::AuthExpired);
        assert_eq!(fake.calls().login, 1);
        assert_eq!(tokens.load().unwrap(), Some(previous));
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_service() {
        let fake = Arc::new(FakeLedger::new());
        let store = store_with(fake.clone(), Arc::new(MemoryTokenStore::new()));

        let err = store.login("  ", "p").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err = store.register("a@x.com", "").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(fake.calls().total(), 0);
    }

    #[tokio::test]
    async fn register_does_not_log_in() {
        let fake = Arc::new(FakeLedger::new());
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_with(fake.clone(), tokens.clone());

        store.register("new@x.com", "pw").await.unwrap();
        assert!(tokens.load().unwrap().is_none());

        let err = store.register("new@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, ClientError::DuplicateAccount(_)));
    }

    #[tokio::test]
    async fn restore_discards_rejected_token() {
        let fake = Arc::new(FakeLedger::with_account("a@x.com", "p", 3));
        let tokens = Arc::new(MemoryTokenStore::with_token(
            BearerToken::new("stale").unwrap(),
        ));
        let store = store_with(fake, tokens.clone());

        assert!(store.restore().await.is_none());
        assert!(tokens.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_keeps_token_when_service_is_down() {
        let fake = Arc::new(FakeLedger::with_account("a@x.com", "p", 3));
        let token = fake.issue_token("a@x.com");
        fake.set_offline(true);
        let tokens = Arc::new(MemoryTokenStore::with_token(token.clone()));
        let store = store_with(fake, tokens.clone());

        assert!(store.restore().await.is_none());
        assert_eq!(tokens.load().unwrap(), Some(token));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let fake = Arc::new(FakeLedger::with_account("a@x.com", "p", 3));
        let tokens = Arc::new(MemoryTokenStore::new());
        let store = store_with(fake, tokens.clone());
        store.login("a@x.com", "p").await.unwrap();

        store.logout();
        store.logout();
        assert!(tokens.load().unwrap().is_none());
    }
}
