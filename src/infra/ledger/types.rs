//! Wire shapes exchanged with the Ledger/Identity Service.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// `GET /me` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    pub credits: i64,
}

/// `POST /auth/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One entry of the caller's registration history (`GET /files`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub file_hash: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default, alias = "metadata_")]
    pub metadata: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Successful `POST /files/register` body. Extra record fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub filename: String,
    pub file_hash: String,
    pub tx_hash: String,
    pub block_number: u64,
}

/// On-chain snapshot returned by `POST /files/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub owner: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub timestamp_iso: String,
    #[serde(default)]
    pub stored_hash: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Raw `POST /files/verify` body. Use `VerificationResult` downstream, never this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub filename: String,
    pub file_hash: String,
    pub on_chain: bool,
    #[serde(default, rename = "match")]
    pub matches: Option<bool>,
    #[serde(default)]
    pub record: Option<ChainRecord>,
}

/// Error body: `{ "detail": ..., "code": ... }`. `detail` may be a string or a
/// structured validation report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<JsonValue>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ApiErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// A file selected for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, keeping only its final path component as the filename.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))?;
        Ok(Self { filename, bytes })
    }
}

/// Accepts RFC3339 and naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamps (the latter read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
