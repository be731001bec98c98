//! Authenticated session: bearer token plus the identity resolved from it.

pub mod store;
pub mod token;

pub use store::SessionStore;
pub use token::{BearerToken, FileTokenStore, MemoryTokenStore, TokenStore};

use crate::infra::ledger::IdentityResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    /// Authoritative balance at the time of the last identity fetch.
    pub credits: u32,
}

impl From<IdentityResponse> for Identity {
    fn from(resp: IdentityResponse) -> Self {
        Self {
            email: resp.email,
            credits: u32::try_from(resp.credits.max(0)).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: BearerToken,
    pub identity: Identity,
}

impl Session {
    pub fn new(token: BearerToken, identity: Identity) -> Self {
        Self { token, identity }
    }

    pub fn email(&self) -> &str {
        &self.identity.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_server_balance_is_clamped() {
        let identity = Identity::from(IdentityResponse {
            id: Some(1),
            email: "a@x.com".into(),
            credits: -2,
        });
        assert_eq!(identity.credits, 0);
    }
}
