pub mod chat;
pub mod error;
pub mod generate;
pub mod health;
pub mod login;
pub mod outputs;
pub mod root;
pub mod session;
pub mod video;

pub use self::error::ApiError;
pub use self::session::{require_api_session, require_page_session, SESSION_COOKIE_NAME};

// common types for the generation handlers
use axum::extract::Multipart;
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

use crate::generator::InputImage;

#[derive(ToSchema, Serialize, Debug, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GenerationResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_output_file(mut self, output_file: Option<String>) -> Self {
        self.output_file = output_file;
        self
    }

    #[must_use]
    pub fn with_video_id(mut self, video_id: String) -> Self {
        self.video_id = Some(video_id);
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: String) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }
}

/// Text fields and the uploaded `file` of an image form.
#[derive(Debug, Default)]
pub struct ImageUpload {
    pub prompt: String,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub image: Option<InputImage>,
}

impl ImageUpload {
    /// # Errors
    /// Returns `ApiError::BadRequest` for malformed multipart bodies.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut upload = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::BadRequest(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let mime_type = field
                        .content_type()
                        .filter(|mime| mime.starts_with("image/"))
                        .map(str::to_string)
                        .or_else(|| field.file_name().and_then(guess_image_mime))
                        .unwrap_or_else(|| "image/png".to_string());
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| ApiError::BadRequest(err.body_text()))?;
                    upload.image = Some(InputImage {
                        bytes: bytes.to_vec(),
                        mime_type,
                    });
                }
                "prompt" | "resolution" | "aspect_ratio" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|err| ApiError::BadRequest(err.body_text()))?;
                    match name.as_str() {
                        "prompt" => upload.prompt = value,
                        "resolution" => upload.resolution = non_empty(value),
                        _ => upload.aspect_ratio = non_empty(value),
                    }
                }
                _ => {}
            }
        }

        Ok(upload)
    }

    /// # Errors
    /// Returns `ApiError::BadRequest` when no file was uploaded.
    pub fn require_image(&mut self) -> Result<InputImage, ApiError> {
        self.image
            .take()
            .filter(|image| !image.bytes.is_empty())
            .ok_or_else(|| ApiError::BadRequest("An image file is required".to_string()))
    }
}

fn guess_image_mime(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime.to_string())
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reject blank prompts before calling the backend.
pub(crate) fn require_prompt(prompt: &str) -> Result<&str, ApiError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("A prompt is required".to_string()));
    }
    Ok(prompt)
}
