//! Video generation and extension.
//!
//! Every generated video leaves its backend handle in the video cache under a
//! fresh `video_id`, owned by the session that generated it. Extending claims
//! that id before the backend is called and consumes it on success, so each id
//! can be extended at most once and a concurrent extend gets 409 instead of
//! paying for a second generation.

use axum::{
    extract::{Extension, Form, Multipart},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    non_empty, outputs::save_output, require_prompt, ApiError, GenerationResponse, ImageUpload,
};
use crate::{
    auth::Session,
    cache::parse_id,
    generator::{VideoArtifact, VideoOptions},
    mediagate::{CachedVideo, MediaState},
};

const DEFAULT_ANIMATE_PROMPT: &str = "Animate this image";

#[derive(ToSchema, Deserialize, Debug)]
pub struct TextToVideo {
    prompt: String,
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    aspect_ratio: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ExtendVideo {
    video_id: String,
    prompt: String,
}

fn video_options(resolution: Option<String>, aspect_ratio: Option<String>) -> VideoOptions {
    let mut options = VideoOptions::default();
    if let Some(resolution) = resolution.and_then(non_empty) {
        options.resolution = resolution;
    }
    if let Some(aspect_ratio) = aspect_ratio.and_then(non_empty) {
        options.aspect_ratio = aspect_ratio;
    }
    options
}

/// Save the file and cache the handle for `owner`; returns the public URL.
async fn store(
    media: &MediaState,
    artifact: VideoArtifact,
    id: Uuid,
    owner: Uuid,
) -> Result<String, ApiError> {
    let output_file = save_output(media.outputs_dir(), &artifact.media).await?;
    media
        .videos()
        .put(
            id,
            CachedVideo {
                handle: artifact.handle,
                owner,
            },
        )
        .await;
    Ok(output_file)
}

#[utoipa::path(
    post,
    path = "/api/text-to-video",
    request_body(content = TextToVideo, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Video generated; `video_id` can be extended", body = GenerationResponse),
        (status = 400, description = "Missing prompt", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "video"
)]
#[instrument(skip_all)]
pub async fn text_to_video(
    media: Extension<Arc<MediaState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<TextToVideo>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let prompt = require_prompt(&form.prompt)?;
    let options = video_options(form.resolution, form.aspect_ratio);

    let artifact = media
        .generator()
        .generate_video(prompt, None, &options)
        .await?;
    let video_id = Uuid::new_v4();
    let output_file = store(&media, artifact, video_id, session.id).await?;

    info!("Video generated: {output_file} ({video_id})");

    Ok(Json(
        GenerationResponse::success("Video generated")
            .with_output_file(Some(output_file))
            .with_video_id(video_id.to_string()),
    ))
}

#[utoipa::path(
    post,
    path = "/api/image-to-video",
    request_body(content_type = "multipart/form-data", description = "`prompt`, `file`, `resolution` and `aspect_ratio` fields"),
    responses (
        (status = 200, description = "Video generated; `video_id` can be extended", body = GenerationResponse),
        (status = 400, description = "Missing file", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "video"
)]
#[instrument(skip_all)]
pub async fn image_to_video(
    media: Extension<Arc<MediaState>>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut upload = ImageUpload::read(multipart).await?;
    let image = upload.require_image()?;
    let prompt = non_empty(upload.prompt).unwrap_or_else(|| DEFAULT_ANIMATE_PROMPT.to_string());
    let options = video_options(upload.resolution, upload.aspect_ratio);

    let artifact = media
        .generator()
        .generate_video(&prompt, Some(image), &options)
        .await?;
    let video_id = Uuid::new_v4();
    let output_file = store(&media, artifact, video_id, session.id).await?;

    info!("Video generated from image: {output_file} ({video_id})");

    Ok(Json(
        GenerationResponse::success("Video generated")
            .with_output_file(Some(output_file))
            .with_video_id(video_id.to_string()),
    ))
}

#[utoipa::path(
    post,
    path = "/api/extend-video",
    request_body(content = ExtendVideo, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Video extended; the old `video_id` is consumed", body = GenerationResponse),
        (status = 400, description = "Missing prompt", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 404, description = "Unknown, expired, foreign or already extended `video_id`", body = super::error::ErrorBody),
        (status = 409, description = "`video_id` is being extended by another request", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "video"
)]
#[instrument(skip_all)]
pub async fn extend_video(
    media: Extension<Arc<MediaState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<ExtendVideo>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let old_id = parse_id(&form.video_id)?;
    let prompt = require_prompt(&form.prompt)?;
    let claim = media
        .videos()
        .claim(&old_id, |video| video.owner == session.id)
        .await?;
    let handle = claim.payload().handle.clone();

    let artifact = match media.generator().extend_video(&handle, prompt).await {
        Ok(artifact) => artifact,
        Err(err) => {
            claim.release().await;
            return Err(err.into());
        }
    };
    let output_file = match save_output(media.outputs_dir(), &artifact.media).await {
        Ok(output_file) => output_file,
        Err(err) => {
            claim.release().await;
            return Err(err);
        }
    };

    let new_id = Uuid::new_v4();
    let successor = CachedVideo {
        handle: artifact.handle,
        owner: session.id,
    };
    if let Err(err) = claim.replace(new_id, successor).await {
        warn!("Video {old_id} vanished while being extended");
        return Err(err.into());
    }

    info!("Video extended: {output_file} ({old_id} -> {new_id})");

    Ok(Json(
        GenerationResponse::success("Video extended")
            .with_output_file(Some(output_file))
            .with_video_id(new_id.to_string()),
    ))
}
