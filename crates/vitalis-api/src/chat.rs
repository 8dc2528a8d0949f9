use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use vitalis_types::api::{ConversationRequest, MessageView, SendTextRequest};
use vitalis_types::models::{Identity, Message, MessageKind};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking, created, ok, required};
use crate::extract::{Caller, Payload};
use crate::files::{MultipartForm, store_audio};

const AUDIO_FIELD: &str = "audio";
const RECEIVER_FIELD: &str = "receiver_id";

async fn counterpart(state: &AppState, id: Uuid) -> ApiResult<Identity> {
    let db = state.clone();
    blocking(move || {
        db.db
            .get_identity(&id)?
            .ok_or_else(|| ApiError::not_found("Receiver not found"))
    })
    .await
}

fn view(message: Message, caller: &Identity) -> MessageView {
    let mine = message.sender == caller.id;
    MessageView { message, mine }
}

/// POST /chat/send-text
pub async fn send_text(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Payload(req): Payload<SendTextRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(text) = required(req.text) else {
        return Err(ApiError::validation("Message text is required"));
    };
    let receiver = counterpart(&state, req.receiver_id).await?;

    let message = Message {
        id: Uuid::new_v4(),
        sender: caller.id,
        receiver: receiver.id,
        kind: MessageKind::Text,
        text: Some(text),
        filename: None,
        created_at: Utc::now(),
    };

    let db = state.clone();
    let stored = message.clone();
    blocking(move || Ok(db.db.insert_message(&stored)?)).await?;

    Ok(created(view(message, &caller)))
}

/// POST /chat/send-audio: multipart with an `audio` file and a `receiver_id`
/// field. The receiver is checked before anything is written to disk.
pub async fn send_audio(
    State(state): State<AppState>,
    Caller(caller): Caller,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;

    let receiver_id = form
        .fields
        .remove(RECEIVER_FIELD)
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or_else(|| ApiError::validation("A valid receiver_id is required"))?;

    let mut files = form.files.into_iter();
    let file = match (files.next(), files.next()) {
        (Some(file), None) if file.field == AUDIO_FIELD => file,
        (None, _) => return Err(ApiError::upload("No audio file uploaded")),
        (Some(file), None) => return Err(ApiError::upload(format!("Unexpected field: {}", file.field))),
        (Some(_), Some(_)) => return Err(ApiError::upload("Only one audio file is allowed")),
    };

    let receiver = counterpart(&state, receiver_id).await?;
    let stored = store_audio(&state.storage, &file).await?;

    let message = Message {
        id: Uuid::new_v4(),
        sender: caller.id,
        receiver: receiver.id,
        kind: MessageKind::Audio,
        text: None,
        filename: Some(stored.name.clone()),
        created_at: Utc::now(),
    };

    let db = state.clone();
    let row = message.clone();
    if let Err(e) = blocking(move || Ok(db.db.insert_message(&row)?)).await {
        warn!("Dropping audio {} after failed insert", stored.name);
        if let Err(cleanup) = state.storage.delete(&stored.name).await {
            warn!("Failed to remove orphaned audio {}: {:#}", stored.name, cleanup);
        }
        return Err(e);
    }

    info!("Audio message {} from {} to {}", message.id, caller.id, receiver.id);
    Ok(created(view(message, &caller)))
}

/// POST /chat/get-texts: the conversation between the caller and
/// `receiver_id` in both directions, oldest first.
pub async fn get_texts(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Payload(req): Payload<ConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let other = counterpart(&state, req.receiver_id).await?;

    let db = state.clone();
    let me = caller.id;
    let messages = blocking(move || Ok(db.db.conversation(&me, &other.id)?)).await?;

    let views: Vec<MessageView> = messages.into_iter().map(|m| view(m, &caller)).collect();
    Ok(ok(views))
}
