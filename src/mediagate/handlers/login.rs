//! Login form, credential submission and logout.

use axum::{
    extract::{ConnectInfo, Extension, Form, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::session::{clear_session_cookie, extract_session_token, session_cookie};
use crate::auth::{client_identifier, AuthError, AuthGate};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginQuery {
    error: Option<String>,
}

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    login_id: String,
    login_password: String,
}

enum Banner {
    None,
    Blocked,
    Remaining(usize),
}

fn render(banner: &Banner) -> Html<String> {
    let notice = match banner {
        Banner::None => String::new(),
        Banner::Blocked => {
            r#"<p class="error">Too many failed attempts. Try again in 5 minutes.</p>"#
                .to_string()
        }
        Banner::Remaining(remaining) => format!(
            r#"<p class="error">Invalid credentials. {remaining} attempt(s) remaining.</p>"#
        ),
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sign in</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main class="login">
<h1>Sign in</h1>
{notice}
<form method="post" action="/login">
<label>ID <input type="text" name="login_id" autocomplete="username" required></label>
<label>Password <input type="password" name="login_password" autocomplete="current-password" required></label>
<button type="submit">Login</button>
</form>
</main>
</body>
</html>
"#
    ))
}

fn peer(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<SocketAddr> {
    connect_info.map(|ConnectInfo(addr)| addr)
}

#[utoipa::path(
    get,
    path = "/login",
    params(("error" = Option<String>, Query, description = "Set to `blocked` after a lockout")),
    responses (
        (status = 200, description = "Login form", content_type = "text/html"),
        (status = 303, description = "Already signed in, redirect to `/`")
    ),
    tag = "auth"
)]
pub async fn login_form(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    gate: Extension<Arc<AuthGate>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if gate.verify(&token).await.is_some() {
            return Redirect::to("/").into_response();
        }
    }

    let identifier = client_identifier(&headers, peer(connect_info));
    let blocked = gate.is_blocked(&identifier).await;
    debug!(blocked, error = ?query.error, "Rendering login form");

    let banner = if blocked {
        Banner::Blocked
    } else {
        Banner::None
    };

    render(&banner).into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Signed in (session cookie set) or blocked (redirect to `/login?error=blocked`)"),
        (status = 401, description = "Invalid credentials, form re-rendered with remaining attempts", content_type = "text/html"),
        (status = 500, description = "Session could not be created")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    gate: Extension<Arc<AuthGate>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let identifier = client_identifier(&headers, peer(connect_info));

    match gate
        .attempt_login(&identifier, &form.login_id, &form.login_password)
        .await
    {
        Ok(issued) => match session_cookie(gate.config(), &issued.token) {
            Ok(cookie) => {
                let mut response = Redirect::to("/").into_response();
                response.headers_mut().insert(SET_COOKIE, cookie);
                response
            }
            Err(err) => {
                error!("Failed to build session cookie: {err}");
                gate.logout(&issued.token).await;
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Err(AuthError::Blocked { .. }) => Redirect::to("/login?error=blocked").into_response(),
        Err(AuthError::InvalidCredentials { remaining }) => (
            StatusCode::UNAUTHORIZED,
            render(&Banner::Remaining(remaining)),
        )
            .into_response(),
        Err(err) => {
            error!("Login failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/logout",
    responses (
        (status = 303, description = "Session removed, redirect to `/login`")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, gate: Extension<Arc<AuthGate>>) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        gate.logout(&token).await;
    }

    let mut response = Redirect::to("/login").into_response();
    match clear_session_cookie(gate.config()) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build logout cookie: {err}"),
    }
    response
}
