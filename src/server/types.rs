//! Request and response bodies

use serde::{Deserialize, Serialize};

use crate::voice::VoiceSummary;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,

    /// Whether the model answered at startup
    pub tortoise_loaded: bool,

    pub cuda_available: bool,

    /// `full` or `simulation`
    pub mode: String,

    pub message: String,
}

/// Test endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub status: String,
    pub message: String,
    pub tortoise_loaded: bool,
    pub mode: String,
    pub endpoints: Vec<String>,
}

/// Voice clone response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneVoiceResponse {
    pub success: bool,
    pub voice_id: String,
    pub samples_count: usize,
    pub message: String,
}

/// Speech generation request
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateSpeechRequest {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub voice_id: Option<String>,

    /// Preset name; the variant default applies when absent
    #[serde(default)]
    pub quality: Option<String>,
}

/// Voice list response
#[derive(Debug, Clone, Serialize)]
pub struct ListVoicesResponse {
    pub voices: Vec<VoiceSummary>,
    pub count: usize,
}

/// Voice delete request
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteVoiceRequest {
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Generic success message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Voice info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInfoResponse {
    pub success: bool,
    pub voice_id: String,
    pub user_id: String,
    pub samples_count: usize,
    pub available: bool,
    pub created_at: String,
    pub ready_for_tts: bool,
}

/// Gradio-style predict request
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    /// First element is the text
    #[serde(default)]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub voice_id: Option<String>,

    #[serde(default)]
    pub quality: Option<String>,
}

impl PredictRequest {
    /// Text from `data[0]`, empty when missing or not a string
    pub fn text(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|d| d.as_array())
            .and_then(|items| items.first())
            .and_then(|first| first.as_str())
            .unwrap_or("")
    }
}

/// Gradio-style predict response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub data: Vec<String>,
    pub is_generating: bool,
}

impl PredictResponse {
    pub fn single(item: impl Into<String>) -> Self {
        Self {
            data: vec![item.into()],
            is_generating: false,
        }
    }
}

/// Upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub files: Vec<String>,
}

/// Bare message body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub message: String,
}

/// Server statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub avg_processing_time_ms: f64,
    pub requests_by_endpoint: std::collections::BTreeMap<String, EndpointStats>,
    /// Audio responses by synthesis mode
    pub audio_by_mode: std::collections::BTreeMap<String, u64>,
    pub voices: usize,
    pub mode: String,
    pub uptime: u64,
    pub conditioning_cache: crate::model::CacheStats,
}

/// Per-endpoint counters
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndpointStats {
    pub count: u64,
    pub failures: u64,
    pub avg_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_text_extraction() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"data": ["hello", 1], "voice_id": "v"}"#).unwrap();
        assert_eq!(req.text(), "hello");

        let not_list: PredictRequest = serde_json::from_str(r#"{"data": "hello"}"#).unwrap();
        assert_eq!(not_list.text(), "");

        let empty: PredictRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
        assert!(empty.voice_id.is_none());
    }

    #[test]
    fn test_generate_request_defaults() {
        let req: GenerateSpeechRequest = serde_json::from_str(r#"{"voice_id": "v"}"#).unwrap();
        assert_eq!(req.text, "");
        assert!(req.quality.is_none());
    }
}
