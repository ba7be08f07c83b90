//! Speech Generation Routes

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::core::error::{Result, ServiceError};
use crate::server::routes::files::wav_response;
use crate::server::routes::{json_rejection, resolve_quality};
use crate::server::server_core::AppState;
use crate::server::types::{GenerateSpeechRequest, PredictRequest, PredictResponse};

/// Attachment name of generated speech
const DOWNLOAD_NAME: &str = "generated_speech.wav";

/// Voice used by predict requests that name none
const DEFAULT_PREDICT_VOICE: &str = "default_voice";

/// Synthesize speech in a cloned voice and return it as a WAV download
pub async fn generate_speech(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<GenerateSpeechRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(|e| json_rejection(&state, e))?;

    let text = request.text.trim();
    if text.is_empty() {
        return Err(ServiceError::validation("text", "No text provided"));
    }
    let voice_id = request
        .voice_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::validation("voice_id", "No voice_id provided"))?;
    let voice = state.registry.get(voice_id)?;
    let quality = resolve_quality(&state, request.quality.as_deref())?;

    info!(
        "Generating speech for voice: {}, text length: {}",
        voice_id,
        text.chars().count()
    );
    let outcome = state.dispatcher.synthesize(&voice, text, quality).await?;
    info!(
        "Speech generated for voice: {} ({}, {:.2}s)",
        voice_id, outcome.mode, outcome.duration_secs
    );

    wav_response(&outcome.path, Some(DOWNLOAD_NAME), Some(outcome.mode)).await
}

/// Gradio-compatible predict: returns the path of the generated WAV
pub async fn gradio_predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = match json_rejection(&state, rejection) {
                ServiceError::Validation { .. } => {
                    ServiceError::validation("data", "No data provided")
                }
                other => other,
            };
            return err.into_plain_response();
        }
    };

    match predict(&state, &request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => e.into_plain_response(),
    }
}

async fn predict(state: &AppState, request: &PredictRequest) -> Result<PredictResponse> {
    let text = request.text().trim();
    if text.is_empty() {
        return Ok(PredictResponse::single("No text provided"));
    }

    let voice_id = request
        .voice_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_PREDICT_VOICE);
    let quality = resolve_quality(state, request.quality.as_deref())?;
    let voice = state.registry.ensure_placeholder(voice_id)?;

    info!(
        "Predict request - voice: {}, text length: {}",
        voice_id,
        text.chars().count()
    );
    let outcome = state.dispatcher.synthesize(&voice, text, quality).await?;

    Ok(PredictResponse::single(outcome.path.to_string_lossy()))
}
