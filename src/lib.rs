pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

#[cfg(test)]
mod testing;

// Convenience re-exports (keeps call-sites clean)
pub use app::controller::{ControllerState, DashboardSnapshot, SessionController};
pub use crypto::hashing::{hash_bytes, hash_file};
pub use domain::session::{BearerToken, FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use domain::workflow::{Verdict, VerificationResult};
pub use error::{ClientError, ClientResult};
pub use infra::config::ClientConfig;
pub use infra::ledger::{FileUpload, HttpLedgerApi, LedgerApi};
