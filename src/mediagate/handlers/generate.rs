use axum::{
    extract::{Extension, Form, Multipart},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{
    non_empty, outputs::save_output, require_prompt, ApiError, GenerationResponse, ImageUpload,
};
use crate::{generator::ImageOptions, mediagate::MediaState};

const DEFAULT_VOICE: &str = "Zephyr";

#[derive(ToSchema, Deserialize, Debug)]
pub struct TextToImage {
    prompt: String,
    #[serde(default)]
    aspect_ratio: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct TextToSpeech {
    prompt: String,
    #[serde(default)]
    voice_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/text-to-image",
    request_body(content = TextToImage, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Image generated", body = GenerationResponse),
        (status = 400, description = "Missing prompt", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "generate"
)]
#[instrument(skip_all)]
pub async fn text_to_image(
    media: Extension<Arc<MediaState>>,
    Form(form): Form<TextToImage>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let prompt = require_prompt(&form.prompt)?;
    let mut options = ImageOptions::default();
    if let Some(aspect_ratio) = form.aspect_ratio.and_then(non_empty) {
        options.aspect_ratio = aspect_ratio;
    }

    let generated = media
        .generator()
        .generate_image(prompt, None, &options)
        .await?;
    let output_file = save_output(media.outputs_dir(), &generated).await?;

    info!("Image generated: {output_file}");

    Ok(Json(
        GenerationResponse::success("Image generated")
            .with_output_file(Some(output_file))
            .with_text(generated.text),
    ))
}

#[utoipa::path(
    post,
    path = "/api/image-to-image",
    request_body(content_type = "multipart/form-data", description = "`prompt` and `file` fields"),
    responses (
        (status = 200, description = "Image edited", body = GenerationResponse),
        (status = 400, description = "Missing prompt or file", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "generate"
)]
#[instrument(skip_all)]
pub async fn image_to_image(
    media: Extension<Arc<MediaState>>,
    multipart: Multipart,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut upload = ImageUpload::read(multipart).await?;
    let image = upload.require_image()?;
    let prompt = require_prompt(&upload.prompt)?;

    let generated = media
        .generator()
        .generate_image(prompt, Some(image), &ImageOptions::default())
        .await?;
    let output_file = save_output(media.outputs_dir(), &generated).await?;

    info!("Image edited: {output_file}");

    Ok(Json(
        GenerationResponse::success("Image generated")
            .with_output_file(Some(output_file))
            .with_text(generated.text),
    ))
}

#[utoipa::path(
    post,
    path = "/api/text-to-speech",
    request_body(content = TextToSpeech, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Speech synthesized", body = GenerationResponse),
        (status = 400, description = "Missing text", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "generate"
)]
#[instrument(skip_all)]
pub async fn text_to_speech(
    media: Extension<Arc<MediaState>>,
    Form(form): Form<TextToSpeech>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let text = require_prompt(&form.prompt)?;
    let voice_name = form
        .voice_name
        .and_then(non_empty)
        .unwrap_or_else(|| DEFAULT_VOICE.to_string());

    let generated = media
        .generator()
        .synthesize_speech(text, &voice_name)
        .await?;
    let output_file = save_output(media.outputs_dir(), &generated).await?;

    info!("Speech synthesized with voice {voice_name}: {output_file}");

    Ok(Json(
        GenerationResponse::success("Speech generated").with_output_file(Some(output_file)),
    ))
}
