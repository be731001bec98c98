//! Unmetered verification of a file against the ledger.
//!
//! `Idle -> Submitting -> {Resolved, Failed}`. Never touches credits or history.

use tracing::{info, warn};

use crate::crypto::hashing::same_fingerprint;
use crate::domain::session::Session;
use crate::error::{ClientError, ClientResult};
use crate::infra::ledger::{ChainRecord, FileUpload, LedgerApi, VerifyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPhase {
    Idle,
    Submitting,
    Resolved,
    Failed,
}

/// "Not found" and "found but mismatched" are distinct outcomes; only the latter carries
/// a match flag and a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NotFound,
    Found {
        matches: bool,
        record: Option<ChainRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub filename: String,
    pub file_hash: String,
    pub verdict: Verdict,
}

impl VerificationResult {
    pub fn on_chain(&self) -> bool {
        matches!(self.verdict, Verdict::Found { .. })
    }

    /// `None` when the file is not on chain.
    pub fn matches(&self) -> Option<bool> {
        match &self.verdict {
            Verdict::NotFound => None,
            Verdict::Found { matches, .. } => Some(*matches),
        }
    }

    /// `None` when the file is not on chain.
    pub fn record(&self) -> Option<&ChainRecord> {
        match &self.verdict {
            Verdict::NotFound => None,
            Verdict::Found { record, .. } => record.as_ref(),
        }
    }

    /// On chain under this name, but the bytes differ from what was registered.
    pub fn is_tampered(&self) -> bool {
        self.matches() == Some(false)
    }
}

impl From<VerifyResponse> for VerificationResult {
    fn from(resp: VerifyResponse) -> Self {
        let verdict = if resp.on_chain {
            let matches = resp.matches.unwrap_or_else(|| {
                resp.record
                    .as_ref()
                    .and_then(|r| r.stored_hash.as_deref())
                    .is_some_and(|stored| same_fingerprint(stored, &resp.file_hash))
            });
            Verdict::Found {
                matches,
                record: resp.record,
            }
        } else {
            Verdict::NotFound
        };
        Self {
            filename: resp.filename,
            file_hash: resp.file_hash,
            verdict,
        }
    }
}

#[derive(Debug)]
pub struct VerificationWorkflow {
    phase: VerificationPhase,
}

impl Default for VerificationWorkflow {
    fn default() -> Self {
        Self {
            phase: VerificationPhase::Idle,
        }
    }
}

impl VerificationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VerificationPhase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = VerificationPhase::Idle;
    }

    pub async fn run<A: LedgerApi + ?Sized>(
        &mut self,
        api: &A,
        session: &Session,
        file: Option<FileUpload>,
    ) -> ClientResult<VerificationResult> {
        let file = match file {
            Some(file) if !file.filename.trim().is_empty() => file,
            _ => {
                return Err(self.fail(ClientError::Validation("Please choose a file.".into())));
            }
        };

        self.phase = VerificationPhase::Submitting;
        let result = match api.verify_file(&session.token, &file).await {
            Ok(resp) => VerificationResult::from(resp),
            Err(ClientError::InsufficientCredits) => {
                // Verification is unmetered; a credit complaint here is a protocol surprise.
                return Err(self.fail(ClientError::Unknown(
                    "verification rejected for credits".into(),
                )));
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.phase = VerificationPhase::Resolved;
        info!(
            filename = %result.filename,
            file_hash = %result.file_hash,
            on_chain = result.on_chain(),
            matches = ?result.matches(),
            "verification resolved"
        );
        Ok(result)
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        warn!(kind = err.kind(), error = %err, "file verification failed");
        self.phase = VerificationPhase::Failed;
        err
    }
}
