//! Append-only chain of file fingerprints backing the reference ledger service.
//!
//! Each registration is one block. A fingerprint can be anchored once; entries are never
//! modified or removed.

use chrono::{TimeZone, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub block_number: u64,
    pub tx_hash: String,
    pub file_hash: String,
    pub filename: String,
    pub owner: String,
    pub metadata: String,
    /// Unix seconds.
    pub timestamp: i64,
}

impl ChainEntry {
    pub fn timestamp_iso(&self) -> String {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain node unreachable")]
    Offline,
    #[error("file {0} is already registered")]
    AlreadyRegistered(String),
}

pub struct ChainBook {
    entries: RwLock<Vec<ChainEntry>>,
    online: AtomicBool,
}

impl Default for ChainBook {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBook {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Takes the node offline (or back online). Offline, every call fails with `Offline`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        info!(online, "chain node availability changed");
    }

    fn ensure_online(&self) -> Result<(), ChainError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChainError::Offline)
        }
    }

    /// Anchors `file_hash` in a new block and returns the block.
    pub async fn append(
        &self,
        file_hash: &str,
        filename: &str,
        owner: &str,
        metadata: &str,
    ) -> Result<ChainEntry, ChainError> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.file_hash.eq_ignore_ascii_case(file_hash)) {
            return Err(ChainError::AlreadyRegistered(file_hash.to_string()));
        }

        let block_number = entries.len() as u64 + 1;
        let prev_tx = entries.last().map(|e| e.tx_hash.as_str()).unwrap_or("0x0");
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut hasher = Sha256::new();
        hasher.update(prev_tx.as_bytes());
        hasher.update(file_hash.as_bytes());
        hasher.update(block_number.to_be_bytes());
        hasher.update(nonce);
        let tx_hash = format!("0x{}", hex::encode(hasher.finalize()));

        let entry = ChainEntry {
            block_number,
            tx_hash,
            file_hash: file_hash.to_lowercase(),
            filename: filename.to_string(),
            owner: owner.to_string(),
            metadata: metadata.to_string(),
            timestamp: Utc::now().timestamp(),
        };
        entries.push(entry.clone());
        info!(block_number, tx_hash = %entry.tx_hash, "appended block");
        Ok(entry)
    }

    pub async fn find_by_hash(&self, file_hash: &str) -> Result<Option<ChainEntry>, ChainError> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.file_hash.eq_ignore_ascii_case(file_hash))
            .cloned())
    }

    /// Most recent block `owner` registered under `filename`.
    pub async fn latest_by_filename(
        &self,
        owner: &str,
        filename: &str,
    ) -> Result<Option<ChainEntry>, ChainError> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.owner == owner && e.filename == filename)
            .cloned())
    }

    pub async fn height(&self) -> u64 {
        self.entries.read().await.len() as u64
    }
}

/// Address-like owner id derived from an account email.
pub fn owner_address(email: &str) -> String {
    let digest = Sha256::digest(email.to_lowercase().as_bytes());
    format!("0x{}", &hex::encode(digest)[..40])
}
