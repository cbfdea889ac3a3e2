//! Session cookie helpers and the guards protecting application routes.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{InvalidHeaderValue, COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{AuthConfig, AuthGate};

pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Build an `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    let ttl_seconds = config.session_ttl_seconds();
    if ttl_seconds > 0 {
        cookie.push_str(&format!("; Max-Age={ttl_seconds}"));
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().map(str::trim);
            let val = parts.next().map(str::trim);
            if let (Some(SESSION_COOKIE_NAME), Some(val)) = (key, val) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// Guard for JSON routes: unknown sessions get a 401 body.
pub async fn require_api_session(
    Extension(gate): Extension<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    match gate.authenticate(token.as_deref()).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(_) => ApiError::Unauthorized.into_response(),
    }
}

/// Guard for browser routes: unknown sessions are sent to the login form.
pub async fn require_page_session(
    Extension(gate): Extension<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    match gate.authenticate(token.as_deref()).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(_) => Redirect::to("/login").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new("admin".to_string(), SecretString::from("secret".to_string()))
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie(&config(), "abc").map(|v| v.to_str().map(str::to_string));
        let Ok(Ok(cookie)) = cookie else {
            panic!("cookie should be valid");
        };
        assert_eq!(
            cookie,
            "session_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
        );
    }

    #[test]
    fn session_cookie_secure_and_without_max_age() {
        let config = config()
            .with_session_ttl_seconds(0)
            .with_session_cookie_secure(true);
        let cookie = session_cookie(&config, "abc").map(|v| v.to_str().map(str::to_string));
        let Ok(Ok(cookie)) = cookie else {
            panic!("cookie should be valid");
        };
        assert_eq!(
            cookie,
            "session_token=abc; Path=/; HttpOnly; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&config()).map(|v| v.to_str().map(str::to_string));
        let Ok(Ok(cookie)) = cookie else {
            panic!("cookie should be valid");
        };
        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn extract_session_token_finds_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_token=tok123; lang=en"),
        );
        assert_eq!(extract_session_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn extract_session_token_ignores_empty_and_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("session_token="));
        assert_eq!(extract_session_token(&headers), None);
    }
}
