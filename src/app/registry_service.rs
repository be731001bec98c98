//! The reference Ledger/Identity Service.
//!
//! This module backs the HTTP handlers of the `ledger_server` binary. It is responsible for:
//! 1.  Accounts, password checks and opaque bearer tokens.
//! 2.  Per-account credit balances, debited once per anchored file.
//! 3.  The append-only history of registered files, and verification against the chain.
//!
//! State is in memory; a restart forgets everything.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::hashing::{hash_bytes, hash_password, same_fingerprint};
use crate::domain::chain::{owner_address, ChainBook, ChainEntry, ChainError};
use crate::transport::http::types::{ChainRecordOut, FileRecordOut, UserOut, VerifyResultOut};

const TOKEN_LEN: usize = 48;
const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already registered.")]
    DuplicateAccount,
    #[error("Incorrect email or password.")]
    InvalidCredentials,
    #[error("Could not validate credentials.")]
    Unauthorized,
    #[error("No credits remaining. Please top up.")]
    InsufficientCredits,
    #[error("Blockchain error: {0}")]
    Ledger(String),
}

impl From<ChainError> for ServiceError {
    fn from(err: ChainError) -> Self {
        ServiceError::Ledger(err.to_string())
    }
}

struct UserRow {
    id: i64,
    email: String,
    salt: String,
    password_hash: String,
    credits: i64,
}

impl UserRow {
    fn to_out(&self) -> UserOut {
        UserOut {
            id: self.id,
            email: self.email.clone(),
            credits: self.credits,
        }
    }
}

struct StoredRecord {
    user_id: i64,
    record: FileRecordOut,
}

pub struct RegistryService {
    users: HashMap<String, UserRow>,
    tokens: HashMap<String, String>,
    records: Vec<StoredRecord>,
    next_user_id: i64,
    next_record_id: i64,
    initial_credits: u32,
}

impl RegistryService {
    pub fn new(initial_credits: u32) -> Self {
        Self {
            users: HashMap::new(),
            tokens: HashMap::new(),
            records: Vec::new(),
            next_user_id: 1,
            next_record_id: 1,
            initial_credits,
        }
    }

    pub fn create_user(&mut self, email: &str, password: &str) -> Result<UserOut, ServiceError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(ServiceError::Validation("Password must not be empty.".into()));
        }
        if self.users.contains_key(&email) {
            return Err(ServiceError::DuplicateAccount);
        }

        let salt = random_string(SALT_LEN);
        let row = UserRow {
            id: self.next_user_id,
            email: email.clone(),
            password_hash: hash_password(&salt, password),
            salt,
            credits: i64::from(self.initial_credits),
        };
        self.next_user_id += 1;
        let out = row.to_out();
        self.users.insert(email, row);
        info!(user_id = out.id, credits = out.credits, "account created");
        Ok(out)
    }

    /// Returns a fresh opaque access token.
    pub fn login(&mut self, email: &str, password: &str) -> Result<String, ServiceError> {
        let email = email.trim().to_lowercase();
        let user = self.users.get(&email).ok_or(ServiceError::InvalidCredentials)?;
        if hash_password(&user.salt, password) != user.password_hash {
            return Err(ServiceError::InvalidCredentials);
        }
        let token = random_string(TOKEN_LEN);
        self.tokens.insert(token.clone(), email);
        Ok(token)
    }

    pub fn authenticate(&self, token: &str) -> Result<UserOut, ServiceError> {
        self.tokens
            .get(token)
            .and_then(|email| self.users.get(email))
            .map(UserRow::to_out)
            .ok_or(ServiceError::Unauthorized)
    }

    /// Drops a token, e.g. to simulate expiry.
    pub fn revoke_token(&mut self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn revoke_all_tokens(&mut self) {
        self.tokens.clear();
    }

    /// Overrides a balance, e.g. to simulate an external top-up or spend.
    pub fn set_credits(&mut self, email: &str, credits: i64) -> bool {
        match self.users.get_mut(&email.trim().to_lowercase()) {
            Some(user) => {
                user.credits = credits;
                true
            }
            None => false,
        }
    }

    /// The caller's records, newest first.
    pub fn list_files(&self, user_id: i64) -> Vec<FileRecordOut> {
        self.records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.record.clone())
            .collect()
    }

    /// Anchors the upload on chain, then debits one credit. Nothing is debited when the
    /// chain rejects the submission.
    pub async fn register_file(
        &mut self,
        chain: &ChainBook,
        user: &UserOut,
        filename: &str,
        bytes: &[u8],
        metadata: &str,
    ) -> Result<FileRecordOut, ServiceError> {
        let credits = self
            .users
            .get(&user.email)
            .map(|u| u.credits)
            .ok_or(ServiceError::Unauthorized)?;
        if credits <= 0 {
            return Err(ServiceError::InsufficientCredits);
        }

        let file_hash = hash_bytes(bytes);
        let entry = match chain
            .append(&file_hash, filename, &owner_address(&user.email), metadata)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "chain submission failed");
                return Err(e.into());
            }
        };

        if let Some(row) = self.users.get_mut(&user.email) {
            row.credits -= 1;
        }
        let record = FileRecordOut {
            id: self.next_record_id,
            filename: filename.to_string(),
            file_hash,
            tx_hash: Some(entry.tx_hash),
            block_number: Some(entry.block_number),
            metadata: Some(metadata.to_string()),
            created_at: Utc::now(),
        };
        self.next_record_id += 1;
        self.records.push(StoredRecord {
            user_id: user.id,
            record: record.clone(),
        });
        info!(
            user_id = user.id,
            record_id = record.id,
            block_number = entry.block_number,
            "file registered"
        );
        Ok(record)
    }

    /// Exact fingerprint hit: on chain and matching. Same filename registered by the caller
    /// with another fingerprint: on chain but mismatched. Otherwise not on chain.
    pub async fn verify_file(
        &self,
        chain: &ChainBook,
        user: &UserOut,
        filename: &str,
        bytes: &[u8],
    ) -> Result<VerifyResultOut, ServiceError> {
        let file_hash = hash_bytes(bytes);

        let found = match chain.find_by_hash(&file_hash).await? {
            Some(entry) => Some(entry),
            None => {
                chain
                    .latest_by_filename(&owner_address(&user.email), filename)
                    .await?
            }
        };

        let (on_chain, matches, record) = match found {
            Some(entry) => {
                let matches = same_fingerprint(&entry.file_hash, &file_hash);
                (true, Some(matches), Some(chain_record_out(&entry)))
            }
            None => (false, None, None),
        };

        Ok(VerifyResultOut {
            filename: filename.to_string(),
            file_hash,
            on_chain,
            matches,
            record,
        })
    }
}

fn chain_record_out(entry: &ChainEntry) -> ChainRecordOut {
    ChainRecordOut {
        owner: entry.owner.clone(),
        timestamp: entry.timestamp,
        timestamp_iso: entry.timestamp_iso(),
        stored_hash: entry.file_hash.clone(),
        metadata: entry.metadata.clone(),
    }
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ServiceError::Validation(format!(
            "'{}' is not a valid email address.",
            email
        ))),
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
