use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use table_types::{Identity, SessionError, SessionToken};

#[derive(Debug)]
struct SessionEntry {
    identity: Identity,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Issues and validates the identity tokens behind the `sid` cookie.
///
/// A session carries at most one identity for its (renewable) lifetime, and
/// a revoked identity is never handed out again; every login mints fresh
/// tokens.
pub struct IdentityStore {
    sessions: RwLock<HashMap<SessionToken, SessionEntry>>,
    ttl: Duration,
}

impl IdentityStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh identity bound to a fresh session token.
    ///
    /// Fails with [`SessionError::AlreadyAuthenticated`] if the caller
    /// presented a session that still carries a live identity. The check and
    /// the mint share one write lock, so two racing logins on the same
    /// session cannot both succeed.
    pub async fn login(
        &self,
        existing: Option<SessionToken>,
    ) -> Result<(SessionToken, Identity), SessionError> {
        let mut sessions = self.sessions.write().await;

        if let Some(token) = existing {
            if sessions.get(&token).is_some_and(SessionEntry::is_live) {
                return Err(SessionError::AlreadyAuthenticated);
            }
            // An expired token on the wire is treated as absent.
            sessions.remove(&token);
        }

        let token = Uuid::new_v4();
        let identity = Uuid::new_v4();
        sessions.insert(
            token,
            SessionEntry {
                identity,
                expires_at: Instant::now() + self.ttl,
            },
        );

        info!("Issued identity {} for a new session", identity);
        Ok((token, identity))
    }

    /// Resolves a session token to its identity. Pure lookup; an expired
    /// session resolves to `None`.
    pub async fn resolve(&self, token: SessionToken) -> Option<Identity> {
        self.sessions
            .read()
            .await
            .get(&token)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.identity)
    }

    /// Resolves a session token and pushes its expiry forward. The gateway
    /// calls this on every authenticated action, so a session stays alive as
    /// long as it keeps being used.
    pub async fn renew(&self, token: SessionToken) -> Option<Identity> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&token) {
            Some(entry) if entry.is_live() => {
                entry.expires_at = Instant::now() + self.ttl;
                Some(entry.identity)
            }
            Some(_) => {
                sessions.remove(&token);
                None
            }
            None => None,
        }
    }

    /// Invalidates the session. Idempotent; returns the identity that was
    /// bound to it, if any, so the caller can tear down its connection.
    pub async fn revoke(&self, token: SessionToken) -> Option<Identity> {
        let removed = self.sessions.write().await.remove(&token);
        if let Some(entry) = &removed {
            info!("Destroyed session for identity {}", entry.identity);
        }
        removed.map(|entry| entry.identity)
    }

    /// Drops every expired session, returning how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live());
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
