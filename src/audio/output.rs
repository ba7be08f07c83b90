//! WAV output
//!
//! Everything the server hands back is 16-bit PCM mono WAV.

use anyhow::{Context, Result};
use std::io::Cursor;
use std::path::Path;

/// Audio output handler for saving generated speech
pub struct AudioOutput;

impl AudioOutput {
    fn spec(sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Save f32 samples (normalized to [-1, 1]) as a 16-bit PCM WAV file
    pub fn save<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = hound::WavWriter::create(path, Self::spec(sample_rate))
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for &sample in samples {
            writer.write_sample(to_pcm16(sample))?;
        }

        writer.finalize().with_context(|| format!("Failed to finalize WAV file: {:?}", path))
    }

    /// Save int16 samples directly
    pub fn save_int16<P: AsRef<Path>>(samples: &[i16], sample_rate: u32, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = hound::WavWriter::create(path, Self::spec(sample_rate))
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for &sample in samples {
            writer.write_sample(sample)?;
        }

        writer.finalize().with_context(|| format!("Failed to finalize WAV file: {:?}", path))
    }

    /// Encode f32 samples into an in-memory WAV
    pub fn encode(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, Self::spec(sample_rate))
                .context("Failed to start WAV stream")?;
            for &sample in samples {
                writer.write_sample(to_pcm16(sample))?;
            }
            writer.finalize().context("Failed to finalize WAV stream")?;
        }
        Ok(cursor.into_inner())
    }
}

fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_mono_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        AudioOutput::save(&[0.0, 0.5, -0.5, 2.0], 24000, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16383, -16383, 32767]);
    }

    #[test]
    fn test_encode_in_memory() {
        let bytes = AudioOutput::encode(&[0.25; 100], 22050).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 200);
    }
}
