//! Auth configuration.

use secrecy::SecretString;
use std::time::Duration;

pub const MAX_FAILED_ATTEMPTS: usize = 3;
pub const ATTEMPT_WINDOW: Duration = Duration::from_secs(60);
pub const BLOCK_DURATION: Duration = Duration::from_secs(5 * 60);
const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    login_id: String,
    login_password: SecretString,
    max_failed_attempts: usize,
    attempt_window: Duration,
    block_duration: Duration,
    session_ttl_seconds: u64,
    session_cookie_secure: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(login_id: String, login_password: SecretString) -> Self {
        Self {
            login_id,
            login_password,
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            attempt_window: ATTEMPT_WINDOW,
            block_duration: BLOCK_DURATION,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: usize) -> Self {
        self.max_failed_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_attempt_window(mut self, window: Duration) -> Self {
        self.attempt_window = window;
        self
    }

    #[must_use]
    pub fn with_block_duration(mut self, duration: Duration) -> Self {
        self.block_duration = duration;
        self
    }

    /// Zero disables server-side expiry and drops `Max-Age` from the cookie.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn login_id(&self) -> &str {
        &self.login_id
    }

    pub(super) fn login_password(&self) -> &SecretString {
        &self.login_password
    }

    #[must_use]
    pub fn max_failed_attempts(&self) -> usize {
        self.max_failed_attempts
    }

    #[must_use]
    pub fn attempt_window(&self) -> Duration {
        self.attempt_window
    }

    #[must_use]
    pub fn block_duration(&self) -> Duration {
        self.block_duration
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_seconds > 0).then(|| Duration::from_secs(self.session_ttl_seconds))
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()));

        assert_eq!(config.login_id(), "admin");
        assert_eq!(config.login_password().expose_secret(), "secret");
        assert_eq!(config.max_failed_attempts(), MAX_FAILED_ATTEMPTS);
        assert_eq!(config.attempt_window(), ATTEMPT_WINDOW);
        assert_eq!(config.block_duration(), BLOCK_DURATION);
        assert_eq!(config.session_ttl(), Some(Duration::from_secs(86_400)));
        assert!(!config.session_cookie_secure());

        let config = config
            .with_max_failed_attempts(5)
            .with_attempt_window(Duration::from_secs(10))
            .with_block_duration(Duration::from_secs(20))
            .with_session_ttl_seconds(0)
            .with_session_cookie_secure(true);

        assert_eq!(config.max_failed_attempts(), 5);
        assert_eq!(config.attempt_window(), Duration::from_secs(10));
        assert_eq!(config.block_duration(), Duration::from_secs(20));
        assert_eq!(config.session_ttl(), None);
        assert!(config.session_cookie_secure());
    }

    #[test]
    fn max_failed_attempts_is_at_least_one() {
        let config = AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()))
            .with_max_failed_attempts(0);
        assert_eq!(config.max_failed_attempts(), 1);
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = AuthConfig::new("admin".to_string(), SecretString::from("hunter2".to_string()));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
