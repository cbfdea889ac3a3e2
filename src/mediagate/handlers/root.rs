use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::error;

use super::session::extract_session_token;
use crate::{auth::AuthGate, mediagate::MediaState};

// axum handler for the application page
pub async fn root(
    headers: HeaderMap,
    gate: Extension<Arc<AuthGate>>,
    media: Extension<Arc<MediaState>>,
) -> Response {
    let token = extract_session_token(&headers);
    if gate.authenticate(token.as_deref()).await.is_err() {
        return Redirect::to("/login").into_response();
    }

    let index = media.static_dir().join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            error!("Failed to read {}: {err}", index.display());
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
