//! Speech model backends
//!
//! The Tortoise model itself runs out of process. `SpeechModel` is the seam
//! the dispatcher talks to; `RemoteTortoise` implements it over HTTP against
//! an inference worker.

pub mod cache;
pub mod remote;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::Waveform;
use crate::core::error::ModelError;

pub use cache::{CacheStats, ConditioningCache};
pub use remote::RemoteTortoise;

/// Tortoise generation preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    UltraFast,
    Fast,
    Standard,
    HighQuality,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::UltraFast,
        Quality::Fast,
        Quality::Standard,
        Quality::HighQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UltraFast => "ultra_fast",
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::HighQuality => "high_quality",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Unknown quality preset '{}', expected one of: ultra_fast, fast, standard, high_quality",
                    s
                )
            })
    }
}

/// Model-specific voice conditioning, opaque to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditioningLatents(pub Vec<u8>);

/// Output of one generation call
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub sample_rate: u32,
    /// Audio chunks in arrival order; the model may yield empty slots
    pub chunks: Vec<Option<Vec<f32>>>,
}

impl Generation {
    /// Concatenate the non-empty chunks in order
    pub fn into_audio(self) -> Result<Vec<f32>, ModelError> {
        let mut audio = Vec::new();
        let mut received = 0usize;
        for (index, chunk) in self.chunks.into_iter().enumerate() {
            match chunk {
                Some(samples) if !samples.is_empty() => {
                    audio.extend_from_slice(&samples);
                    received += 1;
                }
                _ => tracing::warn!("Received empty audio chunk at position {}", index),
            }
        }
        if received == 0 {
            return Err(ModelError::NoAudio);
        }
        Ok(audio)
    }
}

/// Startup probe result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelHealth {
    pub cuda_available: bool,
}

/// A voice-cloning speech model
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Check the model is loaded and report its device
    async fn health(&self) -> Result<ModelHealth, ModelError>;

    /// Derive conditioning data from reference samples
    async fn conditioning_latents(
        &self,
        samples: &[Arc<Waveform>],
    ) -> Result<ConditioningLatents, ModelError>;

    /// Generate speech for `text` in the conditioned voice
    async fn generate(
        &self,
        text: &str,
        latents: &ConditioningLatents,
        preset: Quality,
    ) -> Result<Generation, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parse() {
        assert_eq!("ultra_fast".parse::<Quality>().unwrap(), Quality::UltraFast);
        assert_eq!("high_quality".parse::<Quality>().unwrap(), Quality::HighQuality);
        assert!("turbo".parse::<Quality>().is_err());
        assert_eq!(
            serde_json::to_string(&Quality::Standard).unwrap(),
            "\"standard\""
        );
    }

    #[test]
    fn test_generation_concatenates_in_order() {
        let generation = Generation {
            sample_rate: 24000,
            chunks: vec![Some(vec![1.0, 2.0]), None, Some(vec![]), Some(vec![3.0])],
        };
        assert_eq!(generation.into_audio().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_generation_without_audio_fails() {
        let generation = Generation {
            sample_rate: 24000,
            chunks: vec![None, Some(vec![])],
        };
        assert_eq!(generation.into_audio().unwrap_err(), ModelError::NoAudio);
    }
}
