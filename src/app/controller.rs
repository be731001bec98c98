//! Top-level session state machine.
//!
//! `SessionController` owns the only `Session` in the process together with every cache that
//! hangs off it (credit balance, history, workflow phases). All of that sits behind one async
//! mutex, so workflow runs, refreshes and logout never interleave their writes.
//!
//! Any `AuthExpired` observed while holding the state tears the session down: the persisted
//! token is discarded and every cache is cleared before the error is returned.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::credits::CreditLedgerView;
use crate::domain::history::HistoryView;
use crate::domain::session::{Session, SessionStore, TokenStore};
use crate::domain::workflow::{
    RegistrationPhase, RegistrationRequest, RegistrationSuccess, RegistrationWorkflow,
    VerificationPhase, VerificationResult, VerificationWorkflow,
};
use crate::error::{ClientError, ClientResult};
use crate::infra::ledger::{FileRecord, FileUpload, LedgerApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unauthenticated,
    Authenticated,
}

/// What an authenticated front end renders.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub email: String,
    pub credits: Option<u32>,
    pub history: Vec<FileRecord>,
    pub can_register: bool,
}

struct Shared {
    session: Option<Session>,
    credits: CreditLedgerView,
    history: HistoryView,
    registration: RegistrationWorkflow,
    verification: VerificationWorkflow,
    /// Bumped on every session change; background work started under an older epoch is dropped.
    epoch: u64,
}

impl Shared {
    fn new() -> Self {
        Self {
            session: None,
            credits: CreditLedgerView::new(),
            history: HistoryView::new(),
            registration: RegistrationWorkflow::new(),
            verification: VerificationWorkflow::new(),
            epoch: 0,
        }
    }

    fn state(&self) -> ControllerState {
        if self.session.is_some() {
            ControllerState::Authenticated
        } else {
            ControllerState::Unauthenticated
        }
    }

    fn install(&mut self, session: Session) {
        self.teardown_caches();
        self.credits = CreditLedgerView::from_identity(&session.identity);
        self.session = Some(session);
    }

    fn teardown_caches(&mut self) {
        self.session = None;
        self.credits.clear();
        self.history.clear();
        self.registration.reset();
        self.verification.reset();
        self.epoch += 1;
    }

    fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.session.as_ref().map(|session| DashboardSnapshot {
            email: session.email().to_string(),
            credits: self.credits.current(),
            history: self.history.records().to_vec(),
            can_register: self.credits.can_register(),
        })
    }
}

struct Inner<A: LedgerApi> {
    api: Arc<A>,
    store: SessionStore<A>,
    shared: Mutex<Shared>,
    background: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<A: LedgerApi> Inner<A> {
    /// Clears the session and everything scoped to it, and forgets the persisted token.
    fn teardown(&self, shared: &mut Shared, reason: &str) {
        let had_session = shared.session.is_some();
        shared.teardown_caches();
        self.store.logout();
        if had_session {
            info!(reason, "session ended");
        }
    }

    /// Applies the forced-logout rule to the outcome of an authenticated call.
    fn settle<T>(&self, shared: &mut Shared, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_auth_expired() {
                self.teardown(shared, "token rejected by identity service");
            }
        }
        result
    }

    async fn refresh_all(&self, shared: &mut Shared) -> ClientResult<()> {
        let Shared {
            session,
            credits,
            history,
            ..
        } = shared;
        let session = session.as_mut().ok_or(ClientError::NotAuthenticated)?;
        credits.refresh(self.api.as_ref(), session).await?;
        history.refresh(self.api.as_ref(), &session.token).await?;
        Ok(())
    }
}

pub struct SessionController<A: LedgerApi> {
    inner: Arc<Inner<A>>,
}

impl<A: LedgerApi> Clone for SessionController<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: LedgerApi> SessionController<A> {
    pub fn new(api: Arc<A>, tokens: Arc<dyn TokenStore>) -> Self {
        let store = SessionStore::new(Arc::clone(&api), tokens);
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                shared: Mutex::new(Shared::new()),
                background: std::sync::Mutex::new(None),
            }),
        }
    }

    /// Process start: tries to resume the persisted session. On success the identity and
    /// history are refreshed in the background; `wait_for_background` joins that work.
    pub async fn start(&self) -> ControllerState {
        let mut shared = self.inner.shared.lock().await;
        let Some(session) = self.inner.store.restore().await else {
            return shared.state();
        };
        shared.install(session);
        let epoch = shared.epoch;
        drop(shared);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut shared = inner.shared.lock().await;
            if shared.epoch != epoch {
                debug!("session changed before background refresh ran; skipping");
                return;
            }
            let result = inner.refresh_all(&mut shared).await;
            if let Err(e) = inner.settle(&mut shared, result) {
                warn!(kind = e.kind(), error = %e, "background refresh after restore failed");
            }
        });
        if let Ok(mut slot) = self.inner.background.lock() {
            *slot = Some(handle);
        }
        ControllerState::Authenticated
    }

    /// Waits for the refresh spawned by `start`, if any.
    pub async fn wait_for_background(&self) {
        let handle = match self.inner.background.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "background refresh task aborted");
            }
        }
    }

    pub async fn state(&self) -> ControllerState {
        self.inner.shared.lock().await.state()
    }

    /// Creates an account. The controller state is unchanged either way.
    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<()> {
        self.inner.store.register(email, password).await
    }

    /// Replaces any current session with a fresh one and populates credits and history.
    /// A failed history fetch does not fail the login, unless it reports the new token dead.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<DashboardSnapshot> {
        let mut shared = self.inner.shared.lock().await;
        let session = self.inner.store.login(email, password).await?;
        shared.install(session);

        let Shared {
            session, history, ..
        } = &mut *shared;
        let history_result = match session.as_ref() {
            Some(session) => history
                .refresh(self.inner.api.as_ref(), &session.token)
                .await
                .map(|_| ()),
            None => Err(ClientError::NotAuthenticated),
        };
        match history_result {
            Ok(()) => {}
            Err(e) if e.is_auth_expired() => {
                self.inner.teardown(&mut shared, "token rejected right after login");
                return Err(e);
            }
            Err(e) => warn!(kind = e.kind(), error = %e, "history unavailable after login"),
        }

        shared.snapshot().ok_or(ClientError::NotAuthenticated)
    }

    /// Always succeeds, also when already logged out.
    pub async fn logout(&self) {
        let mut shared = self.inner.shared.lock().await;
        self.inner.teardown(&mut shared, "logout");
    }

    /// Pulls the authoritative balance and history.
    pub async fn refresh(&self) -> ClientResult<DashboardSnapshot> {
        let mut shared = self.inner.shared.lock().await;
        let result = self.inner.refresh_all(&mut shared).await;
        self.inner.settle(&mut shared, result)?;
        shared.snapshot().ok_or(ClientError::NotAuthenticated)
    }

    /// Runs one registration. The submission continues even when the returned future is
    /// dropped, and its outcome is still applied to the caches.
    pub async fn register_file(
        &self,
        file: Option<FileUpload>,
        metadata: impl Into<String>,
    ) -> ClientResult<RegistrationSuccess> {
        let inner = Arc::clone(&self.inner);
        let request = RegistrationRequest {
            file,
            metadata: metadata.into(),
        };
        let task = tokio::spawn(async move {
            let mut shared = inner.shared.lock().await;
            let Shared {
                session,
                credits,
                history,
                registration,
                ..
            } = &mut *shared;
            let Some(session) = session.as_mut() else {
                return Err(ClientError::NotAuthenticated);
            };
            let result = registration
                .run(inner.api.as_ref(), session, credits, history, request)
                .await;

            let expired_during_reconcile = matches!(
                &result,
                Ok(RegistrationSuccess {
                    reconcile_error: Some(ClientError::AuthExpired),
                    ..
                })
            );
            if expired_during_reconcile {
                inner.teardown(&mut shared, "token rejected while reconciling after registration");
            }
            inner.settle(&mut shared, result)
        });
        join(task).await
    }

    /// Runs one verification. Like registration, it is not cancelled by dropping the future.
    pub async fn verify_file(&self, file: Option<FileUpload>) -> ClientResult<VerificationResult> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut shared = inner.shared.lock().await;
            let Shared {
                session,
                verification,
                ..
            } = &mut *shared;
            let Some(session) = session.as_ref() else {
                return Err(ClientError::NotAuthenticated);
            };
            let result = verification.run(inner.api.as_ref(), session, file).await;
            inner.settle(&mut shared, result)
        });
        join(task).await
    }

    pub async fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.inner.shared.lock().await.snapshot()
    }

    pub async fn credits(&self) -> Option<u32> {
        self.inner.shared.lock().await.credits.current()
    }

    pub async fn history(&self) -> Vec<FileRecord> {
        self.inner.shared.lock().await.history.records().to_vec()
    }

    /// Gate for the registration action: authenticated with a known positive balance.
    pub async fn can_register(&self) -> bool {
        let shared = self.inner.shared.lock().await;
        shared.session.is_some() && shared.credits.can_register()
    }

    pub async fn registration_phase(&self) -> RegistrationPhase {
        self.inner.shared.lock().await.registration.phase()
    }

    pub async fn verification_phase(&self) -> VerificationPhase {
        self.inner.shared.lock().await.verification.phase()
    }
}

async fn join<T>(task: JoinHandle<ClientResult<T>>) -> ClientResult<T> {
    task.await
        .map_err(|e| ClientError::Unknown(format!("workflow task failed: {}", e)))?
}
