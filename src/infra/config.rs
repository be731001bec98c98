//! Centralized configuration (environment variables + defaults).

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LEDGER_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_PATH: &str = "~/.config/file-integrity/token";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_INITIAL_CREDITS: u32 = 20;

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Base URL of the Ledger/Identity Service.
pub fn ledger_api_url() -> String {
    std::env::var("LEDGER_API_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEDGER_API_URL.to_string())
}

/// Per-request timeout. Zero is treated as the default.
pub fn request_timeout() -> Duration {
    let secs = parse_or("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);
    if secs == 0 {
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
    } else {
        Duration::from_secs(secs)
    }
}

/// Where the bearer token is persisted between runs (`~` is expanded).
pub fn token_path() -> PathBuf {
    let raw = std::env::var("TOKEN_PATH").unwrap_or_else(|_| DEFAULT_TOKEN_PATH.to_string());
    PathBuf::from(shellexpand::tilde(&raw).to_string())
}

/// Listen address of the reference ledger service.
pub fn bind_addr() -> String {
    std::env::var("LEDGER_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

/// Credits granted to a freshly created account by the reference service.
pub fn initial_credits() -> u32 {
    parse_or("INITIAL_CREDITS", DEFAULT_INITIAL_CREDITS)
}

/// Client-side settings bundled together so tests can build them without touching the env.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub token_path: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            base_url: ledger_api_url(),
            request_timeout: request_timeout(),
            token_path: token_path(),
        }
    }

    pub fn new(base_url: impl Into<String>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_path: token_path.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
