//! Audio processing modules
//!
//! - Audio file loading and decoding (WAV, MP3, FLAC, OGG)
//! - Sample rate conversion to the model's 22050 Hz
//! - WAV output (16-bit PCM mono)
//! - Placeholder tone for simulation mode

mod loader;
mod output;
mod resampler;
mod tone;

pub use loader::{AudioLoader, Waveform};
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use tone::{
    placeholder_duration, PlaceholderTone, MAX_PLACEHOLDER_SECS, PLACEHOLDER_SAMPLE_RATE,
    SECONDS_PER_CHAR, TONE_FREQUENCY_HZ,
};

/// Sample rate reference audio is normalized to before conditioning
pub const MODEL_INPUT_SAMPLE_RATE: u32 = 22050;

/// Sample rate of audio produced by the model
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 24000;
