//! Bearer token value and its persistence.
//!
//! The token is the only durable client state. Identity and credits are always re-fetched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Opaque credential attached as `Authorization: Bearer <token>`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

pub trait TokenStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<BearerToken>>;
    fn save(&self, token: &BearerToken) -> anyhow::Result<()>;
    /// Idempotent: clearing an empty store is not an error.
    fn clear(&self) -> anyhow::Result<()>;
}

/// On-disk layout of the persisted token.
#[derive(Serialize, Deserialize, Debug)]
struct PersistedToken {
    access_token: String,
    saved_at: u64,
}

/// Keeps the token in a small JSON file so a later process can restore the session.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> anyhow::Result<Option<BearerToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let persisted: PersistedToken = serde_json::from_str(&content)?;
        Ok(BearerToken::new(persisted.access_token))
    }

    fn save(&self, token: &BearerToken) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let persisted = PersistedToken {
            access_token: token.expose().to_string(),
            saved_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)?
                .as_secs(),
        };
        let body = serde_json::to_string_pretty(&persisted)?;

        // Owner-only from the moment the file exists.
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten a file left behind by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(body.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, for tests and embedders that do not want a file.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<BearerToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: BearerToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> anyhow::Result<Option<BearerToken>> {
        let guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &BearerToken) -> anyhow::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
