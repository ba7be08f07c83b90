//! Synthesis Dispatcher
//!
//! The backend is chosen once at startup. With a model, a request for a ready
//! voice with decoded samples goes to the model; everything else (and any
//! model failure) produces the placeholder tone when simulation fallback is
//! enabled, or a synthesis error when it is not.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::{placeholder_duration, AudioOutput, PlaceholderTone, MODEL_OUTPUT_SAMPLE_RATE};
use crate::core::error::{ModelError, Result, ServiceError};
use crate::model::{CacheStats, ConditioningCache, ModelHealth, Quality, SpeechModel};
use crate::voice::VoiceEntry;

/// Which path produced a piece of audio, or which path the server runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    Full,
    Simulation,
}

impl SynthesisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Simulation => "simulation",
        }
    }
}

impl fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesis strategy fixed at startup
pub enum SynthesisBackend {
    Model {
        model: Arc<dyn SpeechModel>,
        health: ModelHealth,
    },
    Placeholder,
}

impl SynthesisBackend {
    /// Probe `model` and keep it only if it answers
    pub async fn select(model: Option<Arc<dyn SpeechModel>>) -> Self {
        let Some(model) = model else {
            info!("No speech model configured, running in simulation mode");
            return Self::Placeholder;
        };

        match model.health().await {
            Ok(health) => {
                info!(
                    "Tortoise TTS initialized via {} (CUDA available: {})",
                    model.name(),
                    health.cuda_available
                );
                Self::Model { model, health }
            }
            Err(e) => {
                warn!(
                    "Failed to initialize Tortoise TTS via {}: {}. Running in simulation mode",
                    model.name(),
                    e
                );
                Self::Placeholder
            }
        }
    }

    pub fn mode(&self) -> SynthesisMode {
        match self {
            Self::Model { .. } => SynthesisMode::Full,
            Self::Placeholder => SynthesisMode::Simulation,
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self, Self::Model { .. })
    }

    pub fn cuda_available(&self) -> bool {
        match self {
            Self::Model { health, .. } => health.cuda_available,
            Self::Placeholder => false,
        }
    }

    pub fn model(&self) -> Option<&Arc<dyn SpeechModel>> {
        match self {
            Self::Model { model, .. } => Some(model),
            Self::Placeholder => None,
        }
    }
}

impl fmt::Debug for SynthesisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model { model, health } => f
                .debug_struct("Model")
                .field("model", &model.name())
                .field("health", health)
                .finish(),
            Self::Placeholder => f.write_str("Placeholder"),
        }
    }
}

/// A WAV file produced for one request
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub path: PathBuf,
    pub mode: SynthesisMode,
    pub duration_secs: f64,
    pub sample_rate: u32,
}

/// Routes synthesis requests to the model or the placeholder tone
pub struct SpeechDispatcher {
    backend: SynthesisBackend,
    output_dir: PathBuf,
    simulation_fallback: bool,
    permits: Semaphore,
    latents: ConditioningCache,
    tone: PlaceholderTone,
}

impl SpeechDispatcher {
    pub fn new(
        backend: SynthesisBackend,
        output_dir: impl Into<PathBuf>,
        simulation_fallback: bool,
        max_concurrent: usize,
    ) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            simulation_fallback,
            permits: Semaphore::new(max_concurrent.max(1)),
            latents: ConditioningCache::default(),
            tone: PlaceholderTone::default(),
        }
    }

    pub fn backend(&self) -> &SynthesisBackend {
        &self.backend
    }

    pub fn simulation_fallback(&self) -> bool {
        self.simulation_fallback
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.latents.stats()
    }

    /// Drop cached conditioning for a deleted voice
    pub fn forget_voice(&self, voice_id: &str) {
        if self.latents.remove(voice_id) {
            debug!("Dropped conditioning latents for {}", voice_id);
        }
    }

    /// Produce a WAV for `text` in `voice`
    pub async fn synthesize(
        &self,
        voice: &VoiceEntry,
        text: &str,
        quality: Quality,
    ) -> Result<SynthesisOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::validation("text", "No text provided"));
        }

        match self.generate_with_model(voice, text, quality).await {
            Ok((samples, sample_rate)) => {
                info!(
                    "Generated {:.2}s of speech for voice {}",
                    samples.len() as f64 / sample_rate as f64,
                    voice.voice_id
                );
                self.write_model_audio(samples, sample_rate).await
            }
            Err(err) if self.simulation_fallback => {
                match err {
                    ModelError::Unavailable => debug!("Simulation mode: generating placeholder audio"),
                    err => warn!(
                        "Model synthesis unavailable for voice {}: {}. Using simulation",
                        voice.voice_id, err
                    ),
                }
                self.placeholder(text).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn generate_with_model(
        &self,
        voice: &VoiceEntry,
        text: &str,
        quality: Quality,
    ) -> std::result::Result<(Vec<f32>, u32), ModelError> {
        let model = self.backend.model().ok_or(ModelError::Unavailable)?;
        if !voice.ready_for_tts {
            return Err(ModelError::VoiceNotReady(voice.voice_id.clone()));
        }
        let waveforms = voice.usable_waveforms();
        if waveforms.is_empty() {
            return Err(ModelError::NoUsableSamples);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ModelError::Unavailable)?;

        let latents = match self.latents.get(&voice.voice_id, voice.created_at) {
            Some(latents) => latents,
            None => {
                info!(
                    "Computing conditioning latents for {} from {} samples",
                    voice.voice_id,
                    waveforms.len()
                );
                let computed = model.conditioning_latents(&waveforms).await?;
                self.latents.insert(&voice.voice_id, voice.created_at, computed)
            }
        };

        debug!("Generating speech: {} chars, preset {}", text.chars().count(), quality);
        let generation = model.generate(text, &latents, quality).await?;
        let sample_rate = match generation.sample_rate {
            0 => MODEL_OUTPUT_SAMPLE_RATE,
            sr => sr,
        };
        Ok((generation.into_audio()?, sample_rate))
    }

    async fn write_model_audio(&self, samples: Vec<f32>, sample_rate: u32) -> Result<SynthesisOutcome> {
        let path = self.next_output_path();
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        let target = path.clone();

        tokio::task::spawn_blocking(move || AudioOutput::save(&samples, sample_rate, &target))
            .await?
            .map_err(|e| ServiceError::audio(format!("{:#}", e)))?;

        Ok(SynthesisOutcome {
            path,
            mode: SynthesisMode::Full,
            duration_secs,
            sample_rate,
        })
    }

    /// Write the placeholder tone for `text`
    pub async fn placeholder(&self, text: &str) -> Result<SynthesisOutcome> {
        let duration_secs = placeholder_duration(text);
        let tone = self.tone;
        let path = self.next_output_path();
        let target = path.clone();

        tokio::task::spawn_blocking(move || {
            let samples = tone.render(duration_secs);
            AudioOutput::save_int16(&samples, tone.sample_rate, &target)
        })
        .await?
        .map_err(|e| ServiceError::audio(format!("{:#}", e)))?;

        debug!("Placeholder audio written to {}", path.display());
        Ok(SynthesisOutcome {
            path,
            mode: SynthesisMode::Simulation,
            duration_secs,
            sample_rate: self.tone.sample_rate,
        })
    }

    fn next_output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("speech_{}.wav", Uuid::new_v4().simple()))
    }
}
