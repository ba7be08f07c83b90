//! HTTP client for a Tortoise inference worker
//!
//! Audio crosses the wire as base64 of little-endian `f32` samples.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::audio::Waveform;
use crate::core::error::ModelError;
use crate::model::{ConditioningLatents, Generation, ModelHealth, Quality, SpeechModel};

/// Candidates generated per request
const CANDIDATES: u32 = 1;

/// Tortoise worker reached over HTTP
pub struct RemoteTortoise {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    cuda_available: bool,
}

#[derive(Debug, Serialize)]
struct LatentsRequest {
    sample_rate: u32,
    samples: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LatentsBody {
    latents: String,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    preset: Quality,
    k: u32,
    latents: String,
}

#[derive(Debug, Deserialize)]
struct TtsBody {
    sample_rate: u32,
    #[serde(default)]
    chunks: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct WorkerErrorBody {
    error: String,
}

impl RemoteTortoise {
    /// Create a client for the worker at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ModelError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ModelError> {
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<WorkerErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ModelError::Response(e.to_string()))
    }
}

#[async_trait]
impl SpeechModel for RemoteTortoise {
    fn name(&self) -> &str {
        "tortoise-remote"
    }

    async fn health(&self) -> Result<ModelHealth, ModelError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;
        let body: HealthBody = Self::read_json(response).await?;
        Ok(ModelHealth {
            cuda_available: body.cuda_available,
        })
    }

    async fn conditioning_latents(
        &self,
        samples: &[Arc<Waveform>],
    ) -> Result<ConditioningLatents, ModelError> {
        let sample_rate = samples
            .first()
            .map(|w| w.sample_rate)
            .ok_or(ModelError::NoUsableSamples)?;
        let body = LatentsRequest {
            sample_rate,
            samples: samples.iter().map(|w| encode_samples(&w.samples)).collect(),
        };

        let response = self
            .client
            .post(self.endpoint("conditioning_latents"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;
        let body: LatentsBody = Self::read_json(response).await?;

        let bytes = STANDARD
            .decode(body.latents.as_bytes())
            .map_err(|e| ModelError::Response(format!("latents are not base64: {}", e)))?;
        Ok(ConditioningLatents(bytes))
    }

    async fn generate(
        &self,
        text: &str,
        latents: &ConditioningLatents,
        preset: Quality,
    ) -> Result<Generation, ModelError> {
        let body = TtsRequest {
            text,
            preset,
            k: CANDIDATES,
            latents: STANDARD.encode(&latents.0),
        };

        let response = self
            .client
            .post(self.endpoint("tts"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;
        let body: TtsBody = Self::read_json(response).await?;

        let chunks = body
            .chunks
            .into_iter()
            .map(|chunk| chunk.map(|c| decode_samples(&c)).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Generation {
            sample_rate: body.sample_rate,
            chunks,
        })
    }
}

/// Base64 of little-endian f32 samples
pub fn encode_samples(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Inverse of [`encode_samples`]
pub fn decode_samples(encoded: &str) -> Result<Vec<f32>, ModelError> {
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ModelError::Response(format!("audio chunk is not base64: {}", e)))?;
    if bytes.len() % 4 != 0 {
        return Err(ModelError::Response(format!(
            "audio chunk length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
