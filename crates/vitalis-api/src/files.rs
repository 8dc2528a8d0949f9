use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::{error, info};
use uuid::Uuid;

use vitalis_types::api::AudioUploaded;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, created};
use crate::storage::{Storage, StoredObject};

/// 10 MB ceiling on the combined size of all files in one request.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Body limit for multipart routes: the file ceiling plus room for part headers.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

const AUDIO_FIELD: &str = "audioFile";

/// A file part, fully buffered.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A buffered multipart body: file parts in arrival order plus plain fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: Vec<IncomingFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Buffers every part, failing as soon as the files together pass
    /// `MAX_UPLOAD_BYTES`.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = MultipartForm::default();
        let mut total = 0usize;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
                continue;
            };

            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(multipart_error)?;

            total += data.len();
            if total > MAX_UPLOAD_BYTES {
                return Err(ApiError::upload("File too large. Maximum size is 10MB."));
            }

            form.files.push(IncomingFile {
                field: name,
                file_name,
                content_type,
                data,
            });
        }

        Ok(form)
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::upload(format!("File upload failed: {}", err.body_text()))
}

/// Extension for a stored file: the original one if it looks sane,
/// otherwise the MIME subtype.
pub(crate) fn file_extension(file: &IncomingFile) -> String {
    let from_name = file
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match from_name {
        Some(ext) => ext.to_ascii_lowercase(),
        None => file
            .content_type
            .rsplit_once('/')
            .map(|(_, sub)| sub.trim_start_matches("x-"))
            .filter(|sub| sub.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_ascii_lowercase(),
    }
}

/// Stores a voice note under a fresh name. Only `audio/*` types are accepted.
pub(crate) async fn store_audio(storage: &Storage, file: &IncomingFile) -> ApiResult<StoredObject> {
    if !file.content_type.starts_with("audio/") {
        return Err(ApiError::upload(format!(
            "Invalid file type for audio: {}",
            file.content_type
        )));
    }
    if file.data.is_empty() {
        return Err(ApiError::upload("Audio file is empty"));
    }

    let name = format!("audio-{}.{}", Uuid::new_v4(), file_extension(file));
    storage.put(&name, &file.data).await.map_err(|e| {
        error!("Failed to store audio {}: {:#}", name, e);
        ApiError::Internal(e)
    })
}

/// POST /audio/upload: stores a single `audioFile` part and returns its
/// public path.
pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = MultipartForm::read(multipart).await?;

    let mut files = form.files.into_iter();
    let file = match (files.next(), files.next()) {
        (Some(file), None) if file.field == AUDIO_FIELD => file,
        (None, _) => return Err(ApiError::upload("No file uploaded or invalid file type")),
        (Some(file), None) => return Err(ApiError::upload(format!("Unexpected field: {}", file.field))),
        (Some(_), Some(_)) => return Err(ApiError::upload("Only one audio file is allowed")),
    };

    let stored = store_audio(&state.storage, &file).await?;
    info!("Stored audio upload {} ({} bytes)", stored.name, file.data.len());

    Ok(created(AudioUploaded {
        message: "File uploaded successfully".into(),
        file_path: format!("/uploads/{}", stored.name),
    }))
}
