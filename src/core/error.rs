//! Structured error handling for the voice-cloning server
//!
//! `ServiceError` is what handlers return; it renders itself as the JSON
//! failure payload (`{"success": false, "error": ...}`) with a status code
//! matching its category. `ModelError` covers the model backend and is folded
//! into `ServiceError::Synthesis` when it has to reach a caller.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type alias with ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for request handling
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required field is missing, empty, or malformed
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Lookup of an unknown identifier
    #[error("{what} not found")]
    NotFound { what: &'static str, id: String },

    /// Request body exceeded the configured upload limit
    #[error("File too large. Maximum size is {limit_mb}MB")]
    PayloadTooLarge { limit_mb: u64 },

    /// Access to a path outside the served directory
    #[error("{message}")]
    Forbidden { message: String },

    /// Rendered audio could not be written
    #[error("Audio processing error: {message}")]
    Audio { message: String },

    /// Speech generation failed and no fallback was allowed
    #[error("Speech generation failed: {0}")]
    Synthesis(#[from] ModelError),

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by a speech model backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No model was loaded at startup
    #[error("Tortoise TTS not initialized")]
    Unavailable,

    /// The voice exists but is not flagged for synthesis
    #[error("Voice {0} is not ready for TTS")]
    VoiceNotReady(String),

    /// None of the voice's samples decoded successfully
    #[error("No valid audio samples found")]
    NoUsableSamples,

    /// Transport failure talking to the model worker
    #[error("Model request failed: {0}")]
    Request(String),

    /// Model worker answered with a non-success status
    #[error("Model returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Model worker answered with something we could not interpret
    #[error("Invalid model response: {0}")]
    Response(String),

    /// Generation finished without a single audio chunk
    #[error("No audio generated")]
    NoAudio,
}

impl ServiceError {
    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a not-found error for a voice id
    pub fn voice_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            what: "Voice",
            id: id.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create an audio error
    pub fn audio(message: impl Into<String>) -> Self {
        Self::Audio {
            message: message.into(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        Self::Io {
            message: format!("{} ({})", err, path.display()),
            path: Some(path),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Audio { .. }
            | Self::Synthesis(_)
            | Self::Io { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render with the bare `{"error": ...}` body used by the compatibility endpoints
    pub fn into_plain_response(self) -> Response {
        log_failure(&self);
        let status = self.status_code();
        (status, Json(PlainErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("background task failed: {}", err))
    }
}

/// JSON failure payload
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
struct PlainErrorBody {
    error: String,
}

fn log_failure(err: &ServiceError) {
    if err.status_code().is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        log_failure(&self);
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::validation("text", "No text provided").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::voice_not_found("abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::from(ModelError::NoAudio).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_match_wire_format() {
        assert_eq!(ServiceError::voice_not_found("x").to_string(), "Voice not found");
        assert_eq!(
            ServiceError::PayloadTooLarge { limit_mb: 100 }.to_string(),
            "File too large. Maximum size is 100MB"
        );
        assert_eq!(
            ServiceError::audio("disk full").to_string(),
            "Audio processing error: disk full"
        );
    }
}
