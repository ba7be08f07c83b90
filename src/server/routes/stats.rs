//! Statistics Routes

use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::server::server_core::AppState;
use crate::server::types::{EndpointStats, StatsResponse};

/// Get server statistics
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let tally = state.metrics.snapshot().await;

    let requests_by_endpoint = tally
        .routes
        .iter()
        .map(|(route, t)| {
            (
                route.clone(),
                EndpointStats {
                    count: t.count,
                    failures: t.failures,
                    avg_time_ms: t.avg_ms(),
                },
            )
        })
        .collect();

    Json(StatsResponse {
        total_requests: tally.total(),
        failed_requests: tally.failures(),
        avg_processing_time_ms: tally.avg_time_ms(),
        requests_by_endpoint,
        audio_by_mode: tally.audio_by_mode,
        voices: state.registry.count(),
        mode: state.mode().to_string(),
        uptime: state.uptime().as_secs(),
        conditioning_cache: state.dispatcher.cache_stats(),
    })
}
