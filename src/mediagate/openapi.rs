use super::handlers::{
    chat, error::ErrorBody, generate, health, login, video, GenerationResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        login::login_form,
        login::login,
        login::logout,
        generate::text_to_image,
        generate::image_to_image,
        generate::text_to_speech,
        video::text_to_video,
        video::image_to_video,
        video::extend_video,
        chat::chat,
    ),
    components(schemas(
        health::Health,
        login::LoginForm,
        generate::TextToImage,
        generate::TextToSpeech,
        video::TextToVideo,
        video::ExtendVideo,
        chat::ChatMessage,
        GenerationResponse,
        ErrorBody,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Login form, session cookie and logout"),
        (name = "generate", description = "Image and speech generation"),
        (name = "video", description = "Video generation and extension"),
        (name = "chat", description = "Multi-turn chat"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
