use crate::{auth::AuthGate, cli::telemetry};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;
mod state;
mod sweep;

pub use openapi::openapi;
pub use state::{CachedVideo, ChatSession, MediaState};
pub use sweep::spawn_sweeper;

use handlers::{chat, generate, health, login, root, video};

// uploaded images travel inside multipart bodies
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the application router.
pub fn router(auth: Arc<AuthGate>, media: Arc<MediaState>) -> Router {
    let api = Router::new()
        .route("/api/text-to-image", post(generate::text_to_image))
        .route("/api/image-to-image", post(generate::image_to_image))
        .route("/api/text-to-speech", post(generate::text_to_speech))
        .route("/api/text-to-video", post(video::text_to_video))
        .route("/api/image-to-video", post(video::image_to_video))
        .route("/api/extend-video", post(video::extend_video))
        .route("/api/chat", post(chat::chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(handlers::require_api_session));

    let outputs = Router::new()
        .nest_service("/outputs", ServeDir::new(media.outputs_dir()))
        .layer(middleware::from_fn(handlers::require_page_session));

    Router::new()
        .route("/", get(root::root))
        .route("/login", get(login::login_form).post(login::login))
        .route("/logout", get(login::logout))
        .route("/health", get(health::health))
        .nest_service("/static", ServeDir::new(media.static_dir()))
        .merge(api)
        .merge(outputs)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth))
                .layer(Extension(media)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    auth: Arc<AuthGate>,
    media: Arc<MediaState>,
    sweep_interval: Option<Duration>,
) -> Result<()> {
    tokio::fs::create_dir_all(media.outputs_dir()).await?;

    let sweeper = sweep_interval.map(|interval| spawn_sweeper(auth.clone(), media.clone(), interval));

    let app = router(auth, media);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {err}");
        }
        info!("Gracefully shutdown");
    })
    .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    telemetry::shutdown_tracer();

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
