//! Credit-gated registration of a file fingerprint.
//!
//! `Idle -> Validating -> Submitting -> {Succeeded, Failed}`. A new run starts from any
//! terminal phase; `reset` returns to `Idle` explicitly.

use tracing::{info, warn};

use crate::domain::credits::CreditLedgerView;
use crate::domain::history::HistoryView;
use crate::domain::session::Session;
use crate::error::{ClientError, ClientResult};
use crate::infra::ledger::{FileUpload, LedgerApi, RegistrationReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPhase {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    pub file: Option<FileUpload>,
    pub metadata: String,
}

impl RegistrationRequest {
    pub fn new(file: FileUpload, metadata: impl Into<String>) -> Self {
        Self {
            file: Some(file),
            metadata: metadata.into(),
        }
    }
}

/// A confirmed registration. `reconcile_error` is set when the follow-up credit or history
/// refresh failed; the registration itself still stands.
#[derive(Debug, Clone)]
pub struct RegistrationSuccess {
    pub receipt: RegistrationReceipt,
    pub reconcile_error: Option<ClientError>,
}

#[derive(Debug)]
pub struct RegistrationWorkflow {
    phase: RegistrationPhase,
}

impl Default for RegistrationWorkflow {
    fn default() -> Self {
        Self {
            phase: RegistrationPhase::Idle,
        }
    }
}

impl RegistrationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RegistrationPhase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = RegistrationPhase::Idle;
    }

    /// Submits one file. Never retries: a second attempt is a new user action.
    pub async fn run<A: LedgerApi + ?Sized>(
        &mut self,
        api: &A,
        session: &mut Session,
        credits: &mut CreditLedgerView,
        history: &mut HistoryView,
        request: RegistrationRequest,
    ) -> ClientResult<RegistrationSuccess> {
        self.phase = RegistrationPhase::Validating;

        let file = match request.file {
            Some(file) if !file.filename.trim().is_empty() => file,
            _ => return Err(self.fail(ClientError::Validation("Please choose a file.".into()))),
        };
        if !credits.can_register() {
            return Err(self.fail(ClientError::InsufficientCredits));
        }

        self.phase = RegistrationPhase::Submitting;
        let receipt = match api
            .register_file(&session.token, &file, &request.metadata)
            .await
        {
            Ok(receipt) => receipt,
            Err(ClientError::InsufficientCredits) => {
                // The service's refusal is authoritative over any cached positive balance.
                credits.apply_authoritative(0);
                return Err(self.fail(ClientError::InsufficientCredits));
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.phase = RegistrationPhase::Succeeded;
        credits.optimistic_decrement();
        info!(
            filename = %receipt.filename,
            file_hash = %receipt.file_hash,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            credits_left = ?credits.current(),
            "file registered on ledger"
        );

        let reconcile_error = reconcile(api, session, credits, history).await;
        if let Some(e) = &reconcile_error {
            warn!(kind = e.kind(), error = %e, "reconciliation after registration failed");
        }

        Ok(RegistrationSuccess {
            receipt,
            reconcile_error,
        })
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        warn!(kind = err.kind(), error = %err, "file registration failed");
        self.phase = RegistrationPhase::Failed;
        err
    }
}

/// Pulls the authoritative balance and history after a confirmed registration. A rejected
/// token stops the pass and wins over any other failure.
async fn reconcile<A: LedgerApi + ?Sized>(
    api: &A,
    session: &mut Session,
    credits: &mut CreditLedgerView,
    history: &mut HistoryView,
) -> Option<ClientError> {
    let credit_error = match credits.refresh(api, session).await {
        Ok(_) => None,
        Err(e) if e.is_auth_expired() => return Some(e),
        Err(e) => Some(e),
    };
    match history.refresh(api, &session.token).await {
        Ok(_) => credit_error,
        Err(e) if e.is_auth_expired() => Some(e),
        Err(e) => credit_error.or(Some(e)),
    }
}
