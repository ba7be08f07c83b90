//! Placeholder tone used in simulation mode
//!
//! Not speech: an A4 sine with three harmonics whose length tracks the text,
//! so clients get a playable WAV of roughly the right duration.

use std::f64::consts::PI;

/// Sample rate of placeholder audio
pub const PLACEHOLDER_SAMPLE_RATE: u32 = 22050;

/// Fundamental frequency of the placeholder tone (A4)
pub const TONE_FREQUENCY_HZ: f64 = 440.0;

/// Seconds of audio per character of input text
pub const SECONDS_PER_CHAR: f64 = 0.1;

/// Longest placeholder clip
pub const MAX_PLACEHOLDER_SECS: f64 = 10.0;

/// Duration of the placeholder clip for `text`: `min(chars * 0.1, 10.0)`
pub fn placeholder_duration(text: &str) -> f64 {
    (text.chars().count() as f64 * SECONDS_PER_CHAR).min(MAX_PLACEHOLDER_SECS)
}

/// Sine tone generator
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderTone {
    pub sample_rate: u32,
    pub frequency: f64,
}

impl Default for PlaceholderTone {
    fn default() -> Self {
        Self {
            sample_rate: PLACEHOLDER_SAMPLE_RATE,
            frequency: TONE_FREQUENCY_HZ,
        }
    }
}

impl PlaceholderTone {
    /// Number of samples rendered for `duration_secs`
    pub fn sample_count(&self, duration_secs: f64) -> usize {
        (self.sample_rate as f64 * duration_secs.max(0.0)) as usize
    }

    /// Render `duration_secs` of 16-bit PCM
    pub fn render(&self, duration_secs: f64) -> Vec<i16> {
        let sr = self.sample_rate as f64;
        (0..self.sample_count(duration_secs))
            .map(|n| {
                let t = n as f64 / sr;
                let mut value = (2.0 * PI * self.frequency * t).sin() * 0.3;
                for harmonic in 1..=3 {
                    let h = harmonic as f64;
                    value += (2.0 * PI * self.frequency * h * t).sin() * (0.1 / h);
                }
                (value.clamp(-1.0, 1.0) * 32767.0) as i16
            })
            .collect()
    }
}
