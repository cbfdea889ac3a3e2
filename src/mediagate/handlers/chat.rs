use axum::{
    extract::{Extension, Form},
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{non_empty, outputs::save_output, require_prompt, ApiError, GenerationResponse};
use crate::{
    auth::Session,
    cache::parse_id,
    generator::{Conversation, Role},
    mediagate::{ChatSession, MediaState},
};

#[derive(ToSchema, Deserialize, Debug)]
pub struct ChatMessage {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body(content = ChatMessage, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 200, description = "Model reply; reuse `session_id` to continue", body = GenerationResponse),
        (status = 400, description = "Empty message", body = super::error::ErrorBody),
        (status = 401, description = "No valid session", body = super::error::ErrorBody),
        (status = 404, description = "Unknown, expired or foreign `session_id`", body = super::error::ErrorBody),
        (status = 409, description = "Another message on this `session_id` is in flight", body = super::error::ErrorBody),
        (status = 502, description = "Generation backend failed", body = super::error::ErrorBody)
    ),
    tag = "chat"
)]
#[instrument(skip_all)]
pub async fn chat(
    media: Extension<Arc<MediaState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<ChatMessage>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let message = require_prompt(&form.message)?;

    let claim = match form.session_id.and_then(non_empty) {
        Some(raw) => {
            let id = parse_id(&raw)?;
            let claim = media
                .chats()
                .claim(&id, |chat| chat.owner == session.id)
                .await
                .inspect_err(|err| debug!("Chat {id} not continued: {err}"))?;
            Some(claim)
        }
        None => None,
    };
    let mut chat = claim.as_ref().map_or_else(
        || ChatSession {
            conversation: Conversation::default(),
            owner: session.id,
        },
        |claim| claim.payload().clone(),
    );

    // A dropped claim is released, so early returns leave the history as it was.
    let reply = media.generator().chat(&chat.conversation, message).await?;

    let output_file = if reply.has_media() {
        Some(save_output(media.outputs_dir(), &reply).await?)
    } else {
        None
    };

    chat.conversation.push(Role::User, message);
    chat.conversation
        .push(Role::Model, reply.text.clone().unwrap_or_default());
    let chat_id = match claim {
        Some(claim) => {
            let id = claim.id();
            claim.commit(chat).await;
            id
        }
        None => media.chats().insert(chat).await,
    };

    Ok(Json(
        GenerationResponse::success("Reply generated")
            .with_session_id(chat_id.to_string())
            .with_text(reply.text)
            .with_output_file(output_file),
    ))
}
