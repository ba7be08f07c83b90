//! Health Check Routes

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::server::config::ServerVariant;
use crate::server::server_core::AppState;
use crate::server::types::{HealthResponse, TestResponse};

const ENDPOINTS: [&str; 12] = [
    "GET /health",
    "POST /clone_voice_instant",
    "POST /generate_speech",
    "GET /list_voices",
    "POST /delete_voice",
    "GET /voice_info/<voice_id>",
    "POST /gradio_api/predict",
    "POST /upload",
    "GET /file",
    "POST /file",
    "GET /test",
    "GET /stats",
];

fn server_name(state: &AppState) -> &'static str {
    match state.config.variant {
        ServerVariant::Enhanced => "Enhanced Tortoise TTS Server",
        ServerVariant::Basic => "Tortoise TTS Server",
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backend = state.dispatcher.backend();

    Json(HealthResponse {
        status: "healthy".to_string(),
        tortoise_loaded: backend.is_model_loaded(),
        cuda_available: backend.cuda_available(),
        mode: backend.mode().to_string(),
        message: format!("{} is running", server_name(&state)),
    })
}

/// Liveness probe listing the available endpoints
pub async fn test_endpoint(State(state): State<Arc<AppState>>) -> Json<TestResponse> {
    Json(TestResponse {
        status: "success".to_string(),
        message: format!("{} is working!", server_name(&state)),
        tortoise_loaded: state.is_model_loaded(),
        mode: state.mode().to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}
