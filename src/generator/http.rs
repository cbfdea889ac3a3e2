//! `reqwest` client for a JSON media-generation gateway.
//!
//! Every call is a `POST {base}/v1/<operation>` authenticated with a bearer
//! key. Media travels base64 encoded. Video generation is long running: the
//! gateway answers with an operation that is polled at
//! `GET {base}/v1/operations/<name>` until it reports `done`, or gives up once
//! the configured maximum wait has passed.

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

use super::{
    ChatTurn, Conversation, GeneratedMedia, GeneratorError, ImageOptions, InputImage,
    MediaGenerator, VideoArtifact, VideoHandle, VideoOptions,
};
use crate::APP_USER_AGENT;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1_800);

#[derive(Clone, Debug)]
pub struct HttpGeneratorConfig {
    base_url: Url,
    api_key: SecretString,
    poll_interval: Duration,
    request_timeout: Duration,
    max_wait: Duration,
}

impl HttpGeneratorConfig {
    #[must_use]
    pub fn new(mut base_url: Url, api_key: SecretString) -> Self {
        // `Url::join` replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            api_key,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Upper bound on polling a long-running operation.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[derive(Serialize)]
struct ImagePayload<'a> {
    data: String,
    mime_type: &'a str,
}

impl<'a> ImagePayload<'a> {
    fn from_input(image: &'a InputImage) -> Self {
        Self {
            data: Base64::encode_string(&image.bytes),
            mime_type: &image.mime_type,
        }
    }
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImagePayload<'a>>,
}

#[derive(Serialize)]
struct VideoRequest<'a> {
    prompt: &'a str,
    resolution: &'a str,
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<ImagePayload<'a>>,
}

#[derive(Serialize)]
struct ExtendRequest<'a> {
    handle: &'a VideoHandle,
    prompt: &'a str,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_name: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    history: &'a [ChatTurn],
    message: &'a str,
}

#[derive(Deserialize, Default)]
struct MediaResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl MediaResponse {
    fn into_media(self) -> Result<GeneratedMedia, GeneratorError> {
        let bytes = self
            .data
            .map(|data| Base64::decode_vec(&data).map_err(|_| GeneratorError::InvalidEncoding))
            .transpose()?;
        Ok(GeneratedMedia {
            text: self.text,
            bytes,
            mime_type: self.mime_type,
        })
    }
}

#[derive(Deserialize)]
struct VideoResponse {
    handle: VideoHandle,
    #[serde(flatten)]
    media: MediaResponse,
}

#[derive(Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    video: Option<VideoResponse>,
}

#[derive(Debug)]
pub struct HttpGenerator {
    client: Client,
    config: HttpGeneratorConfig,
}

impl HttpGenerator {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: HttpGeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GeneratorError> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GeneratorError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(body)
            .send()
            .await?;
        decode_response(response).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, GeneratorError> {
        let response = self
            .client
            .get(self.endpoint(path)?)
            .bearer_auth(self.config.api_key.expose_secret())
            .send()
            .await?;
        decode_response(response).await
    }

    /// Poll until the operation finishes or `max_wait` runs out.
    async fn wait(&self, operation: Operation) -> Result<VideoArtifact, GeneratorError> {
        let name = operation.name.clone();
        tokio::time::timeout(self.config.max_wait, self.poll(operation))
            .await
            .map_err(|_| {
                error!("Operation {name} still running after {:?}", self.config.max_wait);
                GeneratorError::Timeout(name)
            })?
    }

    async fn poll(&self, mut operation: Operation) -> Result<VideoArtifact, GeneratorError> {
        loop {
            if operation.done {
                if let Some(message) = operation.error {
                    return Err(GeneratorError::Operation(message));
                }
                let video = operation
                    .video
                    .ok_or(GeneratorError::MissingOutput("video"))?;
                return Ok(VideoArtifact {
                    media: video.media.into_media()?,
                    handle: video.handle,
                });
            }
            debug!("Operation {} still running", operation.name);
            tokio::time::sleep(self.config.poll_interval).await;
            operation = self
                .get(&format!("v1/operations/{}", operation.name))
                .await?;
        }
    }
}

async fn decode_response<R: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<R, GeneratorError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        error!("Generation backend returned {status}: {message}");
        return Err(GeneratorError::Backend {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<R>().await?)
}

#[async_trait]
impl MediaGenerator for HttpGenerator {
    #[instrument(skip(self, prompt, image))]
    async fn generate_image(
        &self,
        prompt: &str,
        image: Option<InputImage>,
        options: &ImageOptions,
    ) -> Result<GeneratedMedia, GeneratorError> {
        let request = ImageRequest {
            prompt,
            aspect_ratio: &options.aspect_ratio,
            image: image.as_ref().map(ImagePayload::from_input),
        };
        let response: MediaResponse = self.post("v1/images", &request).await?;
        response.into_media()
    }

    #[instrument(skip(self, prompt, image))]
    async fn generate_video(
        &self,
        prompt: &str,
        image: Option<InputImage>,
        options: &VideoOptions,
    ) -> Result<VideoArtifact, GeneratorError> {
        let request = VideoRequest {
            prompt,
            resolution: &options.resolution,
            aspect_ratio: &options.aspect_ratio,
            image: image.as_ref().map(ImagePayload::from_input),
        };
        let operation: Operation = self.post("v1/videos", &request).await?;
        self.wait(operation).await
    }

    #[instrument(skip(self, handle, prompt))]
    async fn extend_video(
        &self,
        handle: &VideoHandle,
        prompt: &str,
    ) -> Result<VideoArtifact, GeneratorError> {
        let request = ExtendRequest { handle, prompt };
        let operation: Operation = self.post("v1/videos/extend", &request).await?;
        self.wait(operation).await
    }

    #[instrument(skip(self, text))]
    async fn synthesize_speech(
        &self,
        text: &str,
        voice_name: &str,
    ) -> Result<GeneratedMedia, GeneratorError> {
        let request = SpeechRequest { text, voice_name };
        let response: MediaResponse = self.post("v1/speech", &request).await?;
        response.into_media()
    }

    #[instrument(skip_all)]
    async fn chat(
        &self,
        conversation: &Conversation,
        message: &str,
    ) -> Result<GeneratedMedia, GeneratorError> {
        let request = ChatRequest {
            history: &conversation.turns,
            message,
        };
        let response: MediaResponse = self.post("v1/chat", &request).await?;
        response.into_media()
    }
}
