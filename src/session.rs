//! Upstream session management.
//!
//! [`SessionManager`] owns at most one [`Session`] per account username.
//! Lookups take a shared lock on the session map; logins are serialized per
//! account by an async gate so concurrent misses for the same account result
//! in a single upstream login. Accounts are never evicted: a gateway serves a
//! handful of accounts and sessions live for the process lifetime.
//!
//! A refresh does not lock readers out. Requests that read the old token
//! while a refresh is in flight get an unauthorized response from the
//! upstream and come back through [`SessionManager::refresh`], which notices
//! that the token they saw has already been replaced and reuses the new one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::telemetry;
use crate::types::{Credentials, Session};
use crate::Result;

/// Performs the upstream login for an account.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Session>;
}

/// Caches one authenticated session per account.
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    sessions: RwLock<HashMap<String, Session>>,
    login_gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionManager {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            sessions: RwLock::new(HashMap::new()),
            login_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Return the session for `credentials`, logging in on a miss.
    ///
    /// With `force_refresh`, the currently stored session is discarded and a
    /// new login is performed, unless another caller already replaced it
    /// while this one waited for the account's login gate.
    pub async fn get_session(&self, credentials: &Credentials, force_refresh: bool) -> Result<Session> {
        if !force_refresh {
            if let Some(session) = self.cached(&credentials.username) {
                return Ok(session);
            }
            return self.authenticate(credentials, None, false).await;
        }

        let stale = self.cached(&credentials.username).map(|s| s.token);
        self.authenticate(credentials, stale.as_deref(), true).await
    }

    /// Replace a session whose token the upstream rejected.
    ///
    /// `stale_token` is the token the caller used. If the stored session
    /// already carries a different token, it is returned without a login.
    pub async fn refresh(&self, credentials: &Credentials, stale_token: &str) -> Result<Session> {
        self.authenticate(credentials, Some(stale_token), true).await
    }

    /// Stored session for `username`, without touching the upstream.
    pub fn cached(&self, username: &str) -> Option<Session> {
        self.sessions.read().get(username).cloned()
    }

    /// Number of accounts with a stored session.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        stale_token: Option<&str>,
        forced: bool,
    ) -> Result<Session> {
        let gate = self.login_gate(&credentials.username);
        let _guard = gate.lock().await;

        // Someone may have logged in while we waited on the gate.
        if let Some(current) = self.cached(&credentials.username) {
            let reusable = !forced || stale_token != Some(current.token.as_str());
            if reusable {
                debug!(username = %credentials.username, "reusing session established by a concurrent login");
                return Ok(current);
            }
        }

        let session = match self.authenticator.login(credentials).await {
            Ok(session) => {
                metrics::counter!(telemetry::LOGINS_TOTAL, "status" => "ok").increment(1);
                session
            }
            Err(e) => {
                metrics::counter!(telemetry::LOGINS_TOTAL, "status" => "error").increment(1);
                warn!(username = %credentials.username, error = %e, "upstream login failed");
                return Err(e);
            }
        };

        info!(
            username = %credentials.username,
            user_id = session.user_id,
            refreshed = forced,
            "upstream session established"
        );
        self.sessions
            .write()
            .insert(credentials.username.clone(), session.clone());
        Ok(session)
    }

    fn login_gate(&self, username: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.login_gates
            .lock()
            .entry(username.to_string())
            .or_default()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::GatewayError;

    /// Issues `token-N` on the N-th login.
    struct CountingAuthenticator {
        logins: AtomicU32,
        delay: Duration,
    }

    impl CountingAuthenticator {
        fn new() -> Self {
            Self {
                logins: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                logins: AtomicU32::new(0),
                delay,
            }
        }

        fn count(&self) -> u32 {
            self.logins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for CountingAuthenticator {
        async fn login(&self, credentials: &Credentials) -> Result<Session> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(Session {
                username: credentials.username.clone(),
                token: format!("token-{n}"),
                user_id: 7,
                expires_at: None,
            })
        }
    }

    struct RejectingAuthenticator;

    #[async_trait]
    impl Authenticator for RejectingAuthenticator {
        async fn login(&self, _credentials: &Credentials) -> Result<Session> {
            Err(GatewayError::AuthenticationFailed("bad password".into()))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("marko", "lozinka")
    }

    #[tokio::test]
    async fn second_lookup_reuses_session() {
        let auth = Arc::new(CountingAuthenticator::new());
        let manager = SessionManager::new(auth.clone());

        let first = manager.get_session(&creds(), false).await.unwrap();
        let second = manager.get_session(&creds(), false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.count(), 1);
    }

    #[tokio::test]
    async fn forced_refresh_logs_in_again() {
        let auth = Arc::new(CountingAuthenticator::new());
        let manager = SessionManager::new(auth.clone());

        manager.get_session(&creds(), false).await.unwrap();
        let refreshed = manager.get_session(&creds(), true).await.unwrap();

        assert_eq!(refreshed.token, "token-2");
        assert_eq!(manager.cached("marko").unwrap().token, "token-2");
        assert_eq!(auth.count(), 2);
    }

    #[tokio::test]
    async fn refresh_with_outdated_stale_token_reuses_current() {
        let auth = Arc::new(CountingAuthenticator::new());
        let manager = SessionManager::new(auth.clone());

        manager.get_session(&creds(), false).await.unwrap();
        manager.refresh(&creds(), "token-1").await.unwrap();
        // A second request that also saw token-1 must not log in again.
        let session = manager.refresh(&creds(), "token-1").await.unwrap();

        assert_eq!(session.token, "token-2");
        assert_eq!(auth.count(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_login() {
        let auth = Arc::new(CountingAuthenticator::slow(Duration::from_millis(20)));
        let manager = Arc::new(SessionManager::new(auth.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_session(&creds(), false).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().token, "token-1");
        }

        assert_eq!(auth.count(), 1);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn accounts_are_independent() {
        let auth = Arc::new(CountingAuthenticator::new());
        let manager = SessionManager::new(auth.clone());

        manager.get_session(&creds(), false).await.unwrap();
        manager
            .get_session(&Credentials::new("ana", "tajna"), false)
            .await
            .unwrap();

        assert_eq!(auth.count(), 2);
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn failed_login_stores_nothing() {
        let manager = SessionManager::new(Arc::new(RejectingAuthenticator));

        let err = manager.get_session(&creds(), false).await.unwrap_err();

        assert!(matches!(err, GatewayError::AuthenticationFailed(_)));
        assert!(manager.is_empty());
    }
}
