//! Media generation collaborator.
//!
//! Handlers only see the normalized [`GeneratedMedia`] shape. Backends that hand
//! out continuable artifacts return an opaque [`VideoHandle`] which the caller
//! keeps in the object cache until it is extended.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::http::{HttpGenerator, HttpGeneratorConfig};

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Backend operation failed: {0}")]
    Operation(String),
    #[error("Backend response is missing {0}")]
    MissingOutput(&'static str),
    #[error("Backend response is not valid base64")]
    InvalidEncoding,
    #[error("Backend operation {0} did not finish in time")]
    Timeout(String),
}

/// Normalized generation output; any field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedMedia {
    pub text: Option<String>,
    pub bytes: Option<Vec<u8>>,
    pub mime_type: Option<String>,
}

impl GeneratedMedia {
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.bytes.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Backend reference to a generated video, needed to request an extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoHandle(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoArtifact {
    pub media: GeneratedMedia,
    pub handle: VideoHandle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Conversation history carried between chat requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    pub turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageOptions {
    pub aspect_ratio: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoOptions {
    pub resolution: String,
    pub aspect_ratio: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            resolution: "720p".to_string(),
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// The remote generation service. Implementations may await for a long time
/// (video operations are polled), so callers must not hold locks across calls.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate_image(
        &self,
        prompt: &str,
        image: Option<InputImage>,
        options: &ImageOptions,
    ) -> Result<GeneratedMedia, GeneratorError>;

    async fn generate_video(
        &self,
        prompt: &str,
        image: Option<InputImage>,
        options: &VideoOptions,
    ) -> Result<VideoArtifact, GeneratorError>;

    async fn extend_video(
        &self,
        handle: &VideoHandle,
        prompt: &str,
    ) -> Result<VideoArtifact, GeneratorError>;

    async fn synthesize_speech(
        &self,
        text: &str,
        voice_name: &str,
    ) -> Result<GeneratedMedia, GeneratorError>;

    async fn chat(
        &self,
        conversation: &Conversation,
        message: &str,
    ) -> Result<GeneratedMedia, GeneratorError>;
}
