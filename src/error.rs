//! Error taxonomy shared by the session store, the workflows and the controller.
//!
//! Every workflow failure is returned to the caller as a `ClientError`; nothing here is
//! allowed to escape as a panic.

use thiserror::Error;

/// Machine-readable error codes carried in the `code` field of service error bodies.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const INVALID_CREDENTIALS: &str = "invalid_credentials";
    pub const DUPLICATE_ACCOUNT: &str = "duplicate_account";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const INSUFFICIENT_CREDITS: &str = "insufficient_credits";
    pub const LEDGER_ERROR: &str = "ledger_error";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Missing file or empty credentials, caught before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("login failed: {0}")]
    InvalidCredentials(String),

    #[error("account already exists: {0}")]
    DuplicateAccount(String),

    /// No session is active; a fresh login is required.
    #[error("not logged in")]
    NotAuthenticated,

    /// The service rejected the bearer token. Always tears the session down.
    #[error("session expired, please log in again")]
    AuthExpired,

    #[error("no credits remaining")]
    InsufficientCredits,

    /// Chain submission or query failure. Retried only by a new user action.
    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl ClientError {
    /// Stable short name, suitable for logs and CLI exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation",
            ClientError::InvalidCredentials(_) => "invalid_credentials",
            ClientError::DuplicateAccount(_) => "duplicate_account",
            ClientError::NotAuthenticated => "not_authenticated",
            ClientError::AuthExpired => "auth_expired",
            ClientError::InsufficientCredits => "insufficient_credits",
            ClientError::Ledger(_) => "ledger",
            ClientError::ServiceUnavailable(_) => "service_unavailable",
            ClientError::Unknown(_) => "unknown",
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_human_readable() {
        assert_eq!(
            ClientError::Validation("Please choose a file.".into()).to_string(),
            "Please choose a file."
        );
        assert_eq!(ClientError::InsufficientCredits.to_string(), "no credits remaining");
        assert_eq!(
            ClientError::Ledger("receipt timeout".into()).to_string(),
            "ledger error: receipt timeout"
        );
    }

    #[test]
    fn only_auth_expired_reports_expiry() {
        assert!(ClientError::AuthExpired.is_auth_expired());
        assert!(!ClientError::NotAuthenticated.is_auth_expired());
        assert_eq!(ClientError::NotAuthenticated.kind(), "not_authenticated");
    }
}
