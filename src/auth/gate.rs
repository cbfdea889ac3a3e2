//! Login state machine over the attempt ledger, block list and session store.
//!
//! Flow Overview:
//! 1) A blocked identifier is rejected before anything else is looked at.
//! 2) Correct credentials clear the identifier's ledger and mint a session.
//! 3) Wrong credentials record a failure; reaching the limit inside the window
//!    converts the ledger into a block.
//!
//! The ledger and the block list share one lock so the count-then-block step
//! cannot interleave between concurrent requests from the same identifier.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    attempts::AttemptLedger,
    block_list::BlockList,
    clock::Clock,
    sessions::{Session, SessionStore},
    state::AuthConfig,
    utils::{generate_session_token, secrets_match},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Too many failed attempts: {retry_after_seconds}s remaining")]
    Blocked { retry_after_seconds: u64 },
    #[error("Invalid credentials: {remaining} attempts remaining")]
    InvalidCredentials { remaining: usize },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to generate session token")]
    TokenGeneration(#[source] rand::Error),
}

/// A freshly minted session. The raw token only lives here and in the cookie.
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

#[derive(Debug)]
struct Throttle {
    attempts: AttemptLedger,
    blocks: BlockList,
}

pub struct AuthGate {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    throttle: Mutex<Throttle>,
    sessions: SessionStore,
}

impl AuthGate {
    pub fn new(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let throttle = Throttle {
            attempts: AttemptLedger::new(config.attempt_window()),
            blocks: BlockList::new(config.block_duration()),
        };
        let sessions = SessionStore::new(config.session_ttl());
        Self {
            config,
            clock,
            throttle: Mutex::new(throttle),
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Evaluate a login attempt from `identifier`.
    ///
    /// # Errors
    /// Returns `AuthError::Blocked` while the identifier is blocked or when this
    /// failure reaches the limit, `AuthError::InvalidCredentials` with the number
    /// of attempts left otherwise, and `AuthError::TokenGeneration` if no token
    /// could be minted (nothing is mutated in that case).
    pub async fn attempt_login(
        &self,
        identifier: &str,
        login_id: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let now = self.clock.now();
        let mut throttle = self.throttle.lock().await;

        if let Some(retry_after_seconds) = throttle.blocks.remaining(identifier, now) {
            debug!("Rejected login from blocked identifier {identifier}");
            return Err(AuthError::Blocked {
                retry_after_seconds,
            });
        }

        // Evaluate both comparisons so timing does not reveal which one failed.
        let id_matches = secrets_match(login_id, self.config.login_id());
        let password_matches =
            secrets_match(password, self.config.login_password().expose_secret());

        if id_matches & password_matches {
            let token = generate_session_token().map_err(AuthError::TokenGeneration)?;
            throttle.attempts.clear(identifier);
            let session = Session {
                id: Uuid::new_v4(),
                identifier: identifier.to_string(),
                created_at: now,
            };
            self.sessions.insert(&token, session.clone()).await;
            info!("Login succeeded for {identifier}");
            return Ok(IssuedSession { token, session });
        }

        let count = throttle.attempts.record_failure(identifier, now);
        let limit = self.config.max_failed_attempts();
        if count >= limit {
            throttle.blocks.block(identifier, now);
            throttle.attempts.clear(identifier);
            warn!(
                "Blocked {identifier} for {}s after {count} failed logins",
                self.config.block_duration().as_secs()
            );
            return Err(AuthError::Blocked {
                retry_after_seconds: self.config.block_duration().as_secs(),
            });
        }

        let remaining = limit - count;
        warn!("Failed login from {identifier}, {remaining} attempts remaining");
        Err(AuthError::InvalidCredentials { remaining })
    }

    /// Resolve a session token. Existence (and the TTL, when configured) is all
    /// that is checked.
    pub async fn verify(&self, token: &str) -> Option<Session> {
        self.sessions.lookup(token, self.clock.now()).await
    }

    /// Like [`AuthGate::verify`] for an optional token.
    ///
    /// # Errors
    /// Returns `AuthError::Unauthorized` when the token is missing or unknown.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Session, AuthError> {
        let token = token.ok_or(AuthError::Unauthorized)?;
        self.verify(token).await.ok_or(AuthError::Unauthorized)
    }

    /// Removes the session unconditionally; unknown tokens are a no-op.
    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.remove(token).await {
            info!("Logout for {}", session.identifier);
        }
    }

    pub async fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        self.throttle.lock().await.blocks.is_blocked(identifier, now)
    }

    /// Failures currently counted against `identifier`.
    pub async fn failure_count(&self, identifier: &str) -> usize {
        let now = self.clock.now();
        self.throttle.lock().await.attempts.count(identifier, now)
    }

    /// Drops expired sessions. Blocks and ledgers stay lazily pruned.
    pub async fn sweep(&self) -> usize {
        self.sessions.sweep(self.clock.now()).await
    }

    /// Sessions still inside their TTL; expired ones awaiting a sweep are not counted.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.active(self.clock.now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use secrecy::SecretString;
    use std::time::Duration;

    const IP: &str = "10.0.0.5";

    fn gate_at(clock: &Arc<ManualClock>) -> AuthGate {
        let config = AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()));
        AuthGate::new(config, clock.clone())
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Duration::ZERO))
    }

    fn at(clock: &ManualClock, secs: u64) {
        clock.set(Duration::from_secs(secs));
    }

    #[tokio::test]
    async fn correct_credentials_issue_a_verifiable_token() {
        let clock = clock();
        let gate = gate_at(&clock);

        let issued = gate.attempt_login(IP, "admin", "secret").await;
        let Ok(issued) = issued else {
            panic!("login should succeed");
        };
        assert_eq!(issued.session.identifier, IP);

        let verified = gate.verify(&issued.token).await;
        assert_eq!(verified.map(|s| s.id), Some(issued.session.id));
    }

    #[tokio::test]
    async fn logout_revokes_token_and_is_idempotent() {
        let clock = clock();
        let gate = gate_at(&clock);
        let Ok(issued) = gate.attempt_login(IP, "admin", "secret").await else {
            panic!("login should succeed");
        };

        gate.logout(&issued.token).await;
        assert!(gate.verify(&issued.token).await.is_none());
        gate.logout(&issued.token).await;
        gate.logout("never-issued").await;
    }

    #[tokio::test]
    async fn wrong_credentials_report_remaining_attempts() {
        let clock = clock();
        let gate = gate_at(&clock);

        let first = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(
            first,
            Some(AuthError::InvalidCredentials { remaining: 2 })
        ));
        let second = gate.attempt_login(IP, "nobody", "secret").await.err();
        assert!(matches!(
            second,
            Some(AuthError::InvalidCredentials { remaining: 1 })
        ));
        assert_eq!(gate.failure_count(IP).await, 2);
    }

    #[tokio::test]
    async fn third_failure_in_window_blocks_for_block_duration() {
        let clock = clock();
        let gate = gate_at(&clock);

        for t in 0..2 {
            at(&clock, t);
            let _ = gate.attempt_login(IP, "admin", "wrong").await;
        }
        at(&clock, 2);
        let third = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(
            third,
            Some(AuthError::Blocked {
                retry_after_seconds: 300
            })
        ));
        assert_eq!(gate.failure_count(IP).await, 0);

        clock.set(Duration::from_millis(301_999));
        assert!(gate.is_blocked(IP).await);
        at(&clock, 302);
        assert!(!gate.is_blocked(IP).await);
    }

    #[tokio::test]
    async fn blocked_attempts_do_not_touch_the_ledger() {
        let clock = clock();
        let gate = gate_at(&clock);
        for t in 0..3 {
            at(&clock, t);
            let _ = gate.attempt_login(IP, "admin", "wrong").await;
        }

        at(&clock, 10);
        let before = gate.failure_count(IP).await;
        let rejected = gate.attempt_login(IP, "admin", "secret").await.err();
        assert!(matches!(rejected, Some(AuthError::Blocked { .. })));
        assert_eq!(gate.failure_count(IP).await, before);
    }

    #[tokio::test]
    async fn failures_outside_window_do_not_combine() {
        let clock = clock();
        let gate = gate_at(&clock);

        at(&clock, 0);
        let _ = gate.attempt_login(IP, "admin", "wrong").await;
        at(&clock, 61);
        let second = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(
            second,
            Some(AuthError::InvalidCredentials { remaining: 2 })
        ));
        assert_eq!(gate.failure_count(IP).await, 1);
    }

    #[tokio::test]
    async fn failure_exactly_one_window_old_still_counts() {
        let clock = clock();
        let gate = gate_at(&clock);

        for t in [0, 30] {
            at(&clock, t);
            let _ = gate.attempt_login(IP, "admin", "wrong").await;
        }
        at(&clock, 60);
        let third = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(third, Some(AuthError::Blocked { .. })));
        assert!(gate.is_blocked(IP).await);
    }

    #[tokio::test]
    async fn success_clears_the_ledger() {
        let clock = clock();
        let gate = gate_at(&clock);
        let _ = gate.attempt_login(IP, "admin", "wrong").await;
        let _ = gate.attempt_login(IP, "admin", "wrong").await;

        assert!(gate.attempt_login(IP, "admin", "secret").await.is_ok());
        assert_eq!(gate.failure_count(IP).await, 0);

        // A fresh budget follows the successful login.
        let next = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(
            next,
            Some(AuthError::InvalidCredentials { remaining: 2 })
        ));
    }

    #[tokio::test]
    async fn blocks_are_per_identifier() {
        let clock = clock();
        let gate = gate_at(&clock);
        for _ in 0..3 {
            let _ = gate.attempt_login(IP, "admin", "wrong").await;
        }
        assert!(gate.is_blocked(IP).await);
        assert!(gate.attempt_login("10.0.0.6", "admin", "secret").await.is_ok());
    }

    #[tokio::test]
    async fn scenario_block_then_recover_after_expiry() {
        let clock = clock();
        let gate = gate_at(&clock);

        at(&clock, 0);
        let _ = gate.attempt_login(IP, "admin", "wrong").await;
        at(&clock, 1);
        let _ = gate.attempt_login(IP, "admin", "wrong").await;
        at(&clock, 2);
        let third = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(third, Some(AuthError::Blocked { .. })));

        at(&clock, 10);
        let during = gate.attempt_login(IP, "admin", "secret").await.err();
        assert!(matches!(during, Some(AuthError::Blocked { .. })));

        at(&clock, 302);
        let Ok(issued) = gate.attempt_login(IP, "admin", "secret").await else {
            panic!("login after block expiry should succeed");
        };
        assert!(gate.verify(&issued.token).await.is_some());
    }

    #[tokio::test]
    async fn evaluated_on_merits_after_block_expires() {
        let clock = clock();
        let gate = gate_at(&clock);
        for _ in 0..3 {
            let _ = gate.attempt_login(IP, "admin", "wrong").await;
        }
        at(&clock, 300);
        let after = gate.attempt_login(IP, "admin", "wrong").await.err();
        assert!(matches!(
            after,
            Some(AuthError::InvalidCredentials { remaining: 2 })
        ));
    }

    #[tokio::test]
    async fn concurrent_failures_cannot_slip_under_the_limit() {
        let clock = clock();
        let gate = Arc::new(gate_at(&clock));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.attempt_login(IP, "admin", "wrong").await.err()
            }));
        }

        let mut invalid = 0;
        let mut blocked = 0;
        for handle in handles {
            match handle.await.ok().flatten() {
                Some(AuthError::InvalidCredentials { .. }) => invalid += 1,
                Some(AuthError::Blocked { .. }) => blocked += 1,
                _ => {}
            }
        }
        assert_eq!(invalid, 2);
        assert_eq!(blocked, 8);
    }

    #[tokio::test]
    async fn sessions_expire_server_side() {
        let clock = clock();
        let config = AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()))
            .with_session_ttl_seconds(100);
        let gate = AuthGate::new(config, clock.clone());
        let Ok(issued) = gate.attempt_login(IP, "admin", "secret").await else {
            panic!("login should succeed");
        };

        at(&clock, 99);
        assert!(gate.authenticate(Some(&issued.token)).await.is_ok());
        at(&clock, 100);
        assert!(matches!(
            gate.authenticate(Some(&issued.token)).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            gate.authenticate(None).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn sweep_drops_expired_sessions() {
        let clock = clock();
        let config = AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()))
            .with_session_ttl_seconds(10);
        let gate = AuthGate::new(config, clock.clone());
        let _ = gate.attempt_login(IP, "admin", "secret").await;
        let _ = gate.attempt_login(IP, "admin", "secret").await;

        at(&clock, 11);
        assert_eq!(gate.sweep().await, 2);
        assert!(gate.sessions().is_empty().await);
    }
}
