//! Bearer-token sessions for the HTTP service.
//!
//! A successful login proves the master password by unlocking the vault
//! once, then hands out an opaque random token.  Later requests present
//! the token instead of the password; the registry maps it back to the
//! password the `VaultStore` needs.  Sessions live in memory only and
//! expire after a fixed TTL.
//!
//! Expiry is checked on every `resolve`, so correctness never depends on
//! the background sweep having run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{KeyVaultError, Result};
use crate::vault::VaultStore;

/// Default session lifetime (one hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Random bytes per token (hex-encoded to 64 characters).
const TOKEN_BYTES: usize = 32;

struct Session {
    password: Zeroizing<String>,
    expires_at: Instant,
}

impl Session {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-scoped map of session tokens to unlocked master passwords.
pub struct SessionRegistry {
    store: Arc<VaultStore>,
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Create an empty registry in front of `store`.
    pub fn new(store: Arc<VaultStore>, ttl: Duration) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Verify `password` against the vault and mint a session token.
    ///
    /// A vault that does not exist yet accepts any non-empty password;
    /// the first key added under the session creates the vault with it.
    pub fn login(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(KeyVaultError::Authentication);
        }

        self.store
            .load(password.as_bytes())
            .map_err(|e| match e {
                KeyVaultError::VaultUnlock => KeyVaultError::Authentication,
                other => other,
            })?;

        let token = generate_token();
        self.sessions.insert(
            token.clone(),
            Session {
                password: Zeroizing::new(password.to_string()),
                expires_at: Instant::now() + self.ttl,
            },
        );

        tracing::info!(active = self.sessions.len(), "session opened");
        Ok(token)
    }

    /// Return the master password behind `token`.
    ///
    /// Unknown and expired tokens both fail with `SessionExpired`; an
    /// expired entry is removed on the way out.
    pub fn resolve(&self, token: &str) -> Result<Zeroizing<String>> {
        let now = Instant::now();

        if let Some(session) = self.sessions.get(token) {
            if !session.is_expired(now) {
                return Ok(session.password.clone());
            }
        }

        if self
            .sessions
            .remove_if(token, |_, s| s.is_expired(now))
            .is_some()
        {
            tracing::debug!("expired session removed on access");
        }
        Err(KeyVaultError::SessionExpired)
    }

    /// Invalidate `token` immediately.  Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        if self.sessions.remove(token).is_some() {
            tracing::info!(active = self.sessions.len(), "session closed");
        }
    }

    /// Drop every expired session; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            tracing::debug!(removed, "expired sessions swept");
        }
        removed
    }

    /// Number of sessions that have not expired yet.
    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.sessions.iter().filter(|s| !s.is_expired(now)).count()
    }

    /// Drop all sessions (server shutdown).
    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The vault this registry unlocks.
    pub fn store(&self) -> &Arc<VaultStore> {
        &self.store
    }
}

/// 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn session_expiry_boundary() {
        let now = Instant::now();
        let s = Session {
            password: Zeroizing::new("pw".into()),
            expires_at: now,
        };
        assert!(s.is_expired(now));
        assert!(!s.is_expired(now - Duration::from_millis(1)));
    }
}
