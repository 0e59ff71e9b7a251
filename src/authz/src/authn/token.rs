//! Single-use resume tokens

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use tracing::debug;

use crate::error::AuthError;

/// Default token lifetime in seconds (7 days)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest accepted token lifetime in seconds (10 years)
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Random bytes per token secret before hex encoding
pub const TOKEN_BYTES: usize = 64;

/// A stored token: who it belongs to and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub authid: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Concurrent store of outstanding tokens keyed by secret
#[derive(Debug)]
pub struct TokenStore {
    tokens: DashMap<String, Token>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl,
        }
    }

    /// Mint a new token for `authid` and return its secret
    pub fn issue(&self, authid: &str) -> Result<String, AuthError> {
        if authid.is_empty() {
            return Err(AuthError::InvalidArgument("authid must not be empty".to_string()));
        }
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Internal("token lifetime out of range".to_string()))?;
        let secret = random_secret();
        self.tokens.insert(
            secret.clone(),
            Token {
                authid: authid.to_string(),
                expires_at,
            },
        );
        debug!(authid, "Issued resume token");
        Ok(secret)
    }

    /// Consume a token
    ///
    /// The entry is removed whether or not it is still valid, so two
    /// concurrent redemptions of the same secret see at most one success.
    pub fn redeem(&self, secret: &str) -> Option<Token> {
        let (_, token) = self.tokens.remove(secret)?;
        if token.is_expired_at(Utc::now()) {
            debug!(authid = %token.authid, "Rejected expired resume token");
            return None;
        }
        Some(token)
    }

    /// Drop expired tokens, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, token| !token.is_expired_at(now));
        before.saturating_sub(self.tokens.len())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_issue_and_redeem_once() {
        let store = TokenStore::default();
        let secret = store.issue("alice").unwrap();
        assert_eq!(secret.len(), TOKEN_BYTES * 2);

        let token = store.redeem(&secret).expect("token should be valid");
        assert_eq!(token.authid, "alice");
        assert!(store.redeem(&secret).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_issue_rejects_empty_authid() {
        let store = TokenStore::default();
        assert!(matches!(store.issue(""), Err(AuthError::InvalidArgument(_))));
    }

    #[test]
    fn test_expired_token_is_rejected_and_removed() {
        let store = TokenStore::new(Duration::seconds(-1));
        let secret = store.issue("bob").unwrap();
        assert!(store.redeem(&secret).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_issue_with_unrepresentable_expiry_fails() {
        let store = TokenStore::new(Duration::seconds(10_000_000_000_000));
        assert!(matches!(store.issue("alice"), Err(AuthError::Internal(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let expired = TokenStore::new(Duration::seconds(-1));
        expired.issue("a").unwrap();
        expired.issue("b").unwrap();
        assert_eq!(expired.purge_expired(), 2);

        let live = TokenStore::default();
        live.issue("c").unwrap();
        assert_eq!(live.purge_expired(), 0);
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_redeem_single_winner() {
        let store = Arc::new(TokenStore::default());
        let secret = store.issue("carol").unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let secret = secret.clone();
            handles.push(tokio::spawn(async move { store.redeem(&secret).is_some() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
