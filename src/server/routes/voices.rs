//! Voice Management Routes

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::error::{Result, ServiceError};
use crate::server::routes::{json_rejection, multipart_error, multipart_rejection};
use crate::server::server_core::AppState;
use crate::server::types::{
    CloneVoiceResponse, DeleteVoiceRequest, ListVoicesResponse, MessageResponse, VoiceInfoResponse,
};
use crate::voice::{validate_voice_name, UploadedFile};

/// Form fields carrying reference audio start with this
const SAMPLE_FIELD_PREFIX: &str = "voice_sample_";

/// Register a voice from uploaded reference samples
pub async fn clone_voice_instant(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<CloneVoiceResponse>> {
    let mut multipart = multipart.map_err(multipart_rejection)?;

    let mut user_id: Option<String> = None;
    let mut voice_name: Option<String> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name.starts_with(SAMPLE_FIELD_PREFIX) {
            let filename = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| multipart_error(&state, e))?;
            match filename {
                Some(filename) if !filename.is_empty() => uploads.push(UploadedFile {
                    field: name,
                    filename,
                    bytes: bytes.to_vec(),
                }),
                _ => debug!("Skipping {} without a filename", name),
            }
        } else if name == "user_id" {
            user_id = Some(field.text().await.map_err(|e| multipart_error(&state, e))?);
        } else if name == "voice_name" {
            voice_name = Some(field.text().await.map_err(|e| multipart_error(&state, e))?);
        }
    }

    let user_id = user_id.unwrap_or_else(|| "anonymous".to_string());
    let voice_name = voice_name.unwrap_or_else(|| format!("voice_{}", user_id));
    info!(
        "Processing voice cloning request for user {}: {} files",
        user_id,
        uploads.len()
    );

    if uploads.is_empty() {
        return Err(ServiceError::validation(
            "voice_sample",
            "No valid audio samples provided",
        ));
    }

    validate_voice_name(&voice_name)?;

    let samples = state.ingest.ingest_all(&voice_name, &uploads).await?;
    let entry = state.registry.register(&user_id, &voice_name, samples)?;
    state.dispatcher.forget_voice(&entry.voice_id);

    if state.is_model_loaded() {
        if let Err(e) = state.library.mirror(&entry).await {
            warn!("Failed to copy samples for {} to model directory: {}", entry.voice_id, e);
        }
    }

    Ok(Json(CloneVoiceResponse {
        success: true,
        voice_id: entry.voice_id.clone(),
        samples_count: entry.samples_count(),
        message: format!("Voice cloned successfully! ({} mode)", state.mode()),
    }))
}

/// List all cloned voices
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Result<Json<ListVoicesResponse>> {
    let voices = state.registry.list()?;
    Ok(Json(ListVoicesResponse {
        count: voices.len(),
        voices,
    }))
}

/// Delete a cloned voice and its files
pub async fn delete_voice(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<DeleteVoiceRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(request) = body.map_err(|e| json_rejection(&state, e))?;
    let voice_id = request
        .voice_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::validation("voice_id", "No voice_id provided"))?;

    state.registry.delete(&voice_id)?;
    state.dispatcher.forget_voice(&voice_id);
    state.library.remove(&voice_id).await;

    Ok(Json(MessageResponse {
        success: true,
        message: "Voice deleted successfully".to_string(),
    }))
}

/// Details of one voice
pub async fn voice_info(
    State(state): State<Arc<AppState>>,
    Path(voice_id): Path<String>,
) -> Result<Json<VoiceInfoResponse>> {
    let entry = state.registry.get(&voice_id)?;
    Ok(Json(VoiceInfoResponse {
        success: true,
        voice_id: entry.voice_id.clone(),
        user_id: entry.user_id.clone(),
        samples_count: entry.samples_count(),
        available: true,
        created_at: entry.created_at.to_rfc3339(),
        ready_for_tts: entry.ready_for_tts,
    }))
}
