//! Persisting generated media under the outputs directory.

use std::path::Path;
use tracing::debug;
use ulid::Ulid;

use super::error::ApiError;
use crate::generator::{GeneratedMedia, GeneratorError};

pub const OUTPUTS_ROUTE: &str = "/outputs";

/// File extension for a MIME type, parameters (`;rate=24000`) ignored.
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/webp" => ".webp",
        "video/mp4" => ".mp4",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/mpeg" => ".mp3",
        _ => ".bin",
    }
}

/// Write the media bytes to `output_<ULID><ext>` and return the public URL.
pub async fn save_output(dir: &Path, media: &GeneratedMedia) -> Result<String, ApiError> {
    let bytes = media
        .bytes
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or(GeneratorError::MissingOutput("media"))?;

    let extension = extension_for(media.mime_type.as_deref().unwrap_or_default());
    let name = format!("output_{}{extension}", Ulid::new());

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&name), bytes).await?;

    debug!("Saved {} bytes to {name}", bytes.len());

    Ok(format!("{OUTPUTS_ROUTE}/{name}"))
}
