//! Voice-Cloning Server Core
//!
//! Shared state, router assembly and the serve loop.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    middleware::{from_fn_with_state, map_response_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::audio::MODEL_INPUT_SAMPLE_RATE;
use crate::core::error::ErrorBody;
use crate::model::{RemoteTortoise, SpeechModel};
use crate::server::config::ServerConfig;
use crate::server::middleware::{json_payload_too_large, performance_monitor, MetricsState};
use crate::server::routes;
use crate::synthesis::{SpeechDispatcher, SynthesisBackend, SynthesisMode};
use crate::voice::{SampleIngest, VoiceLibrary, VoiceRegistry};

/// State shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Cloned voices
    pub registry: VoiceRegistry,
    /// Model or placeholder synthesis
    pub dispatcher: SpeechDispatcher,
    /// Upload persistence and decoding
    pub ingest: SampleIngest,
    /// Per-voice sample folders for the model
    pub library: VoiceLibrary,
    /// Request metrics
    pub metrics: Arc<MetricsState>,
    /// Start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Build state around an already selected backend
    pub fn new(config: ServerConfig, backend: SynthesisBackend) -> Self {
        let temp_dir = config.storage.temp_dir.clone();
        let dispatcher = SpeechDispatcher::new(
            backend,
            &temp_dir,
            config.simulation_fallback(),
            config.model.max_concurrent,
        );

        Self {
            registry: VoiceRegistry::new(),
            dispatcher,
            ingest: SampleIngest::new(&temp_dir, MODEL_INPUT_SAMPLE_RATE),
            library: VoiceLibrary::new(config.storage.voices_dir()),
            metrics: Arc::new(MetricsState::new(config.logging.access_log)),
            start_time: Instant::now(),
            config,
        }
    }

    /// Create the temp directories and probe the configured model
    pub async fn initialize(config: ServerConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.storage.temp_dir).await?;

        let model: Option<Arc<dyn SpeechModel>> = match config.model.endpoint() {
            Some(url) => {
                info!("Initializing Tortoise TTS worker at {}", url);
                Some(Arc::new(RemoteTortoise::new(url, config.model.timeout())?))
            }
            None => None,
        };

        let backend = SynthesisBackend::select(model).await;
        if backend.is_model_loaded() {
            tokio::fs::create_dir_all(config.storage.voices_dir()).await?;
        }

        Ok(Self::new(config, backend))
    }

    pub fn mode(&self) -> SynthesisMode {
        self.dispatcher.backend().mode()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.dispatcher.backend().is_model_loaded()
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_id = HeaderName::from_static("x-request-id");
    let limit_mb = state.config.storage.max_upload_mb();
    let body_limit = state.config.storage.max_upload_bytes;
    let metrics = state.metrics.clone();

    Router::new()
        // Health and diagnostics
        .route("/health", get(routes::health::health_check))
        .route("/test", get(routes::health::test_endpoint))
        .route("/stats", get(routes::stats::get_stats))

        // Voice management
        .route("/clone_voice_instant", post(routes::voices::clone_voice_instant))
        .route("/list_voices", get(routes::voices::list_voices))
        .route("/delete_voice", post(routes::voices::delete_voice))
        .route("/voice_info/:voice_id", get(routes::voices::voice_info))

        // Synthesis
        .route("/generate_speech", post(routes::speech::generate_speech))
        .route("/gradio_api/predict", post(routes::speech::gradio_predict))

        // Files
        .route("/upload", post(routes::files::upload_files))
        .route(
            "/file",
            get(routes::files::serve_file).post(routes::files::file_endpoint),
        )

        // State
        .with_state(state)
        // Middleware
        .layer(map_response_with_state(limit_mb, json_payload_too_large))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(metrics, performance_monitor))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);

    let body = ErrorBody {
        success: false,
        error: "Internal server error".to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Voice-cloning server
pub struct TortoiseServer {
    config: ServerConfig,
}

impl TortoiseServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run the server until ctrl-c
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::new(AppState::initialize(self.config.clone()).await?);
        let mode = state.mode();
        let router = create_router(state);

        let addr = self.config.bind_address();
        info!(
            "Starting Tortoise TTS server on http://{} ({} variant, {} mode)",
            addr, self.config.variant, mode
        );
        if mode == SynthesisMode::Simulation {
            warn!("No speech model available: generated audio will be a placeholder tone");
        }

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
