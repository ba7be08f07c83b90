//! Request Monitoring Middleware
//!
//! Request timing and per-endpoint counters, plus response fix-ups for
//! rejections axum produces before a handler runs.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::core::error::ServiceError;
use crate::server::routes::files::SYNTHESIS_MODE_HEADER;

/// Requests slower than this are logged as warnings
const SLOW_REQUEST_MS: f64 = 1000.0;

/// Counters for one route template
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RouteTally {
    pub count: u64,
    pub failures: u64,
    pub total_ms: f64,
}

impl RouteTally {
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_ms / self.count as f64
    }
}

/// Request counters behind `/stats`
#[derive(Debug, Default, Clone)]
pub struct RequestTally {
    pub routes: BTreeMap<String, RouteTally>,
    /// Audio responses by their `X-Synthesis-Mode` value
    pub audio_by_mode: BTreeMap<String, u64>,
}

impl RequestTally {
    pub fn record(&mut self, route: &str, status: StatusCode, duration_ms: f64, mode: Option<&str>) {
        let tally = self.routes.entry(route.to_string()).or_default();
        tally.count += 1;
        tally.total_ms += duration_ms;
        if !status.is_success() {
            tally.failures += 1;
        }

        if let Some(mode) = mode {
            *self.audio_by_mode.entry(mode.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.routes.values().map(|t| t.count).sum()
    }

    pub fn failures(&self) -> u64 {
        self.routes.values().map(|t| t.failures).sum()
    }

    pub fn avg_time_ms(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.routes.values().map(|t| t.total_ms).sum::<f64>() / total as f64
    }
}

/// Shared metrics handle
pub struct MetricsState {
    tally: RwLock<RequestTally>,
    access_log: bool,
}

impl MetricsState {
    pub fn new(access_log: bool) -> Self {
        Self {
            tally: RwLock::new(RequestTally::default()),
            access_log,
        }
    }

    pub async fn snapshot(&self) -> RequestTally {
        self.tally.read().await.clone()
    }

    pub async fn record(&self, route: &str, status: StatusCode, duration_ms: f64, mode: Option<&str>) {
        self.tally.write().await.record(route, status, duration_ms, mode);
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Request timing middleware
///
/// Endpoints are keyed by their route template (`/voice_info/:voice_id`), so
/// per-voice paths do not each get their own counter.
pub async fn performance_monitor(
    State(metrics): State<Arc<MetricsState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();
    let mode = response
        .headers()
        .get(SYNTHESIS_MODE_HEADER)
        .and_then(|v| v.to_str().ok());

    metrics.record(&endpoint, status, duration_ms, mode).await;

    if duration_ms > SLOW_REQUEST_MS {
        warn!(
            "Slow request: {} {} took {:.2}ms (status: {})",
            method, path, duration_ms, status
        );
    } else if metrics.access_log {
        info!(
            "Request: {} {} took {:.2}ms (status: {})",
            method, path, duration_ms, status
        );
    }

    response
}

/// Replace axum's plain-text 413 with the JSON failure payload
pub async fn json_payload_too_large(
    State(limit_mb): State<u64>,
    response: Response,
) -> Response {
    let is_plain_413 = response.status() == StatusCode::PAYLOAD_TOO_LARGE
        && !response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

    if is_plain_413 {
        return ServiceError::PayloadTooLarge { limit_mb }.into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_by_route_and_mode() {
        let mut tally = RequestTally::default();
        tally.record("/health", StatusCode::OK, 10.0, None);
        tally.record("/health", StatusCode::OK, 30.0, None);
        tally.record("/generate_speech", StatusCode::OK, 50.0, Some("simulation"));
        tally.record("/generate_speech", StatusCode::NOT_FOUND, 10.0, None);

        assert_eq!(tally.total(), 4);
        assert_eq!(tally.failures(), 1);
        assert!((tally.avg_time_ms() - 25.0).abs() < 1e-9);
        assert!((tally.routes["/health"].avg_ms() - 20.0).abs() < 1e-9);
        assert_eq!(tally.routes["/generate_speech"].failures, 1);
        assert_eq!(tally.audio_by_mode.get("simulation"), Some(&1));
        assert_eq!(tally.audio_by_mode.get("full"), None);
        assert_eq!(RouteTally::default().avg_ms(), 0.0);
    }
}
