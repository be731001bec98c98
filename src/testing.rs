//! Scripted in-process `LedgerApi` used by unit tests. Counts every call so tests can assert
//! that a guarded operation never reached the service.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::crypto::hashing::hash_bytes;
use crate::domain::session::BearerToken;
use crate::error::{ClientError, ClientResult};
use crate::infra::ledger::{
    ChainRecord, FileRecord, FileUpload, IdentityResponse, LedgerApi, RegistrationReceipt,
    VerifyResponse,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CallCounts {
    pub signup: u32,
    pub login: u32,
    pub identity: u32,
    pub list_files: u32,
    pub register: u32,
    pub verify: u32,
    pub health: u32,
}

impl CallCounts {
    pub fn total(&self) -> u32 {
        self.signup
            + self.login
            + self.identity
            + self.list_files
            + self.register
            + self.verify
            + self.health
    }
}

struct Account {
    password: String,
    credits: i64,
}

struct ChainEntry {
    owner: String,
    filename: String,
    file_hash: String,
    metadata: String,
    block_number: u64,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    next_token: u64,
    records: Vec<(String, FileRecord)>,
    chain: Vec<ChainEntry>,
    offline: bool,
    chain_down: bool,
    reject_all_tokens: bool,
    leaky_not_found: bool,
    history_unavailable: bool,
    identity_unavailable: bool,
    expire_after_register: bool,
    register_delay: Option<Duration>,
    calls: CallCounts,
}

#[derive(Default)]
pub(crate) struct FakeLedger {
    state: Mutex<State>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(email: &str, password: &str, credits: i64) -> Self {
        let fake = Self::new();
        fake.add_account(email, password, credits);
        fake
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_account(&self, email: &str, password: &str, credits: i64) {
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                credits,
            },
        );
    }

    /// Mints a valid token for `email` without going through login.
    pub fn issue_token(&self, email: &str) -> BearerToken {
        let mut st = self.lock();
        st.next_token += 1;
        let raw = format!("fake-token-{}", st.next_token);
        st.tokens.insert(raw.clone(), email.to_string());
        BearerToken::new(raw).unwrap()
    }

    pub fn set_credits(&self, email: &str, credits: i64) {
        if let Some(acct) = self.lock().accounts.get_mut(email) {
            acct.credits = credits;
        }
    }

    pub fn credits_of(&self, email: &str) -> i64 {
        self.lock().accounts.get(email).map(|a| a.credits).unwrap_or(0)
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn set_chain_down(&self, down: bool) {
        self.lock().chain_down = down;
    }

    /// Every subsequent authenticated call answers 401.
    pub fn expire_tokens(&self) {
        self.lock().reject_all_tokens = true;
    }

    /// Mimic a service that fills `match`/`record` even for unknown hashes.
    pub fn set_leaky_not_found(&self, leaky: bool) {
        self.lock().leaky_not_found = leaky;
    }

    /// `GET /files` fails with a transport error; everything else keeps working.
    pub fn set_history_unavailable(&self, unavailable: bool) {
        self.lock().history_unavailable = unavailable;
    }

    /// `GET /me` fails with a transport error; everything else keeps working.
    pub fn set_identity_unavailable(&self, unavailable: bool) {
        self.lock().identity_unavailable = unavailable;
    }

    /// Tokens die right after the next successful registration.
    pub fn set_expire_after_register(&self, expire: bool) {
        self.lock().expire_after_register = expire;
    }

    pub fn set_register_delay(&self, delay: Duration) {
        self.lock().register_delay = Some(delay);
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn owner_of(st: &State, token: &BearerToken) -> ClientResult<String> {
        if st.reject_all_tokens {
            return Err(ClientError::AuthExpired);
        }
        st.tokens
            .get(token.expose())
            .cloned()
            .ok_or(ClientError::AuthExpired)
    }

    fn check_online(st: &State) -> ClientResult<()> {
        if st.offline {
            Err(ClientError::ServiceUnavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerApi for FakeLedger {
    async fn create_account(&self, email: &str, password: &str) -> ClientResult<()> {
        let mut st = self.lock();
        st.calls.signup += 1;
        Self::check_online(&st)?;
        let email = email.to_lowercase();
        if st.accounts.contains_key(&email) {
            return Err(ClientError::DuplicateAccount("Email already registered.".into()));
        }
        st.accounts.insert(
            email,
            Account {
                password: password.to_string(),
                credits: 20,
            },
        );
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<BearerToken> {
        {
            let mut st = self.lock();
            st.calls.login += 1;
            Self::check_online(&st)?;
            match st.accounts.get(&email.to_lowercase()) {
                Some(acct) if acct.password == password => {}
                _ => {
                    return Err(ClientError::InvalidCredentials(
                        "Incorrect email or password.".into(),
                    ))
                }
            }
        }
        Ok(self.issue_token(&email.to_lowercase()))
    }

    async fn identity(&self, token: &BearerToken) -> ClientResult<IdentityResponse> {
        let mut st = self.lock();
        st.calls.identity += 1;
        Self::check_online(&st)?;
        if st.identity_unavailable {
            return Err(ClientError::ServiceUnavailable("identity endpoint down".into()));
        }
        let owner = Self::owner_of(&st, token)?;
        let credits = st.accounts.get(&owner).map(|a| a.credits).unwrap_or(0);
        Ok(IdentityResponse {
            id: Some(1),
            email: owner,
            credits,
        })
    }

    async fn list_files(&self, token: &BearerToken) -> ClientResult<Vec<FileRecord>> {
        let mut st = self.lock();
        st.calls.list_files += 1;
        Self::check_online(&st)?;
        if st.history_unavailable {
            return Err(ClientError::ServiceUnavailable("history endpoint down".into()));
        }
        let owner = Self::owner_of(&st, token)?;
        Ok(st
            .records
            .iter()
            .rev()
            .filter(|(o, _)| *o == owner)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn register_file(
        &self,
        token: &BearerToken,
        upload: &FileUpload,
        metadata: &str,
    ) -> ClientResult<RegistrationReceipt> {
        let delay = {
            let mut st = self.lock();
            st.calls.register += 1;
            st.register_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut st = self.lock();
        Self::check_online(&st)?;
        let owner = Self::owner_of(&st, token)?;
        if st.accounts.get(&owner).map(|a| a.credits).unwrap_or(0) <= 0 {
            return Err(ClientError::InsufficientCredits);
        }
        if st.chain_down {
            return Err(ClientError::Ledger("Blockchain error: node unreachable".into()));
        }
        let file_hash = hash_bytes(&upload.bytes);
        if st.chain.iter().any(|e| e.file_hash == file_hash) {
            return Err(ClientError::Ledger("Blockchain error: already registered".into()));
        }

        let block_number = st.chain.len() as u64 + 1;
        let tx_hash = format!("0x{:064x}", block_number);
        st.chain.push(ChainEntry {
            owner: owner.clone(),
            filename: upload.filename.clone(),
            file_hash: file_hash.clone(),
            metadata: metadata.to_string(),
            block_number,
        });
        if let Some(acct) = st.accounts.get_mut(&owner) {
            acct.credits -= 1;
        }
        let record = FileRecord {
            id: st.records.len() as i64 + 1,
            filename: upload.filename.clone(),
            file_hash: file_hash.clone(),
            tx_hash: Some(tx_hash.clone()),
            block_number: Some(block_number),
            metadata: Some(metadata.to_string()),
            created_at: Utc::now(),
        };
        st.records.push((owner, record));
        if st.expire_after_register {
            st.reject_all_tokens = true;
        }

        Ok(RegistrationReceipt {
            filename: upload.filename.clone(),
            file_hash,
            tx_hash,
            block_number,
        })
    }

    async fn verify_file(
        &self,
        token: &BearerToken,
        upload: &FileUpload,
    ) -> ClientResult<VerifyResponse> {
        let mut st = self.lock();
        st.calls.verify += 1;
        Self::check_online(&st)?;
        let owner = Self::owner_of(&st, token)?;
        if st.chain_down {
            return Err(ClientError::Ledger("Blockchain error: node unreachable".into()));
        }
        let file_hash = hash_bytes(&upload.bytes);

        let snapshot = |e: &ChainEntry| ChainRecord {
            owner: e.owner.clone(),
            timestamp: Some(e.block_number as i64),
            timestamp_iso: "2024-01-01T00:00:00+00:00".into(),
            stored_hash: Some(e.file_hash.clone()),
            metadata: Some(e.metadata.clone()),
        };

        let (on_chain, matches, record) =
            if let Some(e) = st.chain.iter().find(|e| e.file_hash == file_hash) {
                (true, Some(true), Some(snapshot(e)))
            } else if let Some(e) = st
                .chain
                .iter()
                .rev()
                .find(|e| e.owner == owner && e.filename == upload.filename)
            {
                (true, Some(false), Some(snapshot(e)))
            } else if st.leaky_not_found {
                let ghost = ChainRecord {
                    owner: "0x0".into(),
                    timestamp: None,
                    timestamp_iso: String::new(),
                    stored_hash: None,
                    metadata: None,
                };
                (false, Some(false), Some(ghost))
            } else {
                (false, None, None)
            };

        Ok(VerifyResponse {
            filename: upload.filename.clone(),
            file_hash,
            on_chain,
            matches,
            record,
        })
    }

    async fn health(&self) -> ClientResult<()> {
        let mut st = self.lock();
        st.calls.health += 1;
        Self::check_online(&st)
    }
}
