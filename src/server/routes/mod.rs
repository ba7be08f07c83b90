//! HTTP route handlers

pub mod files;
pub mod health;
pub mod speech;
pub mod stats;
pub mod voices;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::core::error::ServiceError;
use crate::model::Quality;
use crate::server::server_core::AppState;

/// Map a multipart read failure, keeping the size limit distinct
pub(crate) fn multipart_error(state: &AppState, err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge {
            limit_mb: state.config.storage.max_upload_mb(),
        }
    } else {
        ServiceError::validation("multipart", err.body_text())
    }
}

pub(crate) fn multipart_rejection(rejection: MultipartRejection) -> ServiceError {
    ServiceError::validation("multipart", rejection.body_text())
}

/// Map a JSON body rejection, keeping the size limit distinct
pub(crate) fn json_rejection(state: &AppState, rejection: JsonRejection) -> ServiceError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge {
            limit_mb: state.config.storage.max_upload_mb(),
        }
    } else {
        ServiceError::validation("body", rejection.body_text())
    }
}

/// Requested preset, or the variant default
pub(crate) fn resolve_quality(state: &AppState, requested: Option<&str>) -> Result<Quality, ServiceError> {
    match requested.map(str::trim).filter(|q| !q.is_empty()) {
        Some(name) => name
            .parse()
            .map_err(|e: String| ServiceError::validation("quality", e)),
        None => Ok(state.config.default_quality()),
    }
}
