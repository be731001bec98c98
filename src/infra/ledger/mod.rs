//! The Ledger/Identity Service as seen by the client.
//!
//! `LedgerApi` is the only seam through which the session store and the workflows talk to
//! the outside world. `HttpLedgerApi` is the production implementation.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::domain::session::BearerToken;
use crate::error::ClientResult;

pub use client::HttpLedgerApi;
pub use types::{
    ApiErrorBody, ChainRecord, FileRecord, FileUpload, IdentityResponse, LoginResponse,
    RegistrationReceipt, VerifyResponse,
};

#[async_trait]
pub trait LedgerApi: Send + Sync + 'static {
    /// `POST /auth/register`. Creates an account, never a session.
    async fn create_account(&self, email: &str, password: &str) -> ClientResult<()>;

    /// `POST /auth/login` (form encoded).
    async fn login(&self, email: &str, password: &str) -> ClientResult<BearerToken>;

    /// `GET /me`.
    async fn identity(&self, token: &BearerToken) -> ClientResult<IdentityResponse>;

    /// `GET /files`.
    async fn list_files(&self, token: &BearerToken) -> ClientResult<Vec<FileRecord>>;

    /// `POST /files/register`. Not idempotent: callers must never retry automatically.
    async fn register_file(
        &self,
        token: &BearerToken,
        upload: &FileUpload,
        metadata: &str,
    ) -> ClientResult<RegistrationReceipt>;

    /// `POST /files/verify`. Unmetered.
    async fn verify_file(&self, token: &BearerToken, upload: &FileUpload)
        -> ClientResult<VerifyResponse>;

    /// `GET /health`.
    async fn health(&self) -> ClientResult<()>;
}
