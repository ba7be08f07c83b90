//! Audio file loading
//!
//! Reference samples arrive in whatever format the client recorded. WAV is
//! read with hound; everything else (MP3, FLAC, OGG/Vorbis, ...) goes through
//! symphonia's probe. Either way the result is downmixed to mono and brought
//! to the requested sample rate.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::Resampler;

/// Mono waveform normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Audio loader that supports various formats via symphonia
pub struct AudioLoader;

impl AudioLoader {
    /// Decode `path` to a mono waveform at `target_sr`
    pub fn load<P: AsRef<Path>>(path: P, target_sr: u32) -> Result<Waveform> {
        let path = path.as_ref();

        let (interleaved, channels, source_sr) = if is_wav(path) {
            Self::decode_wav(path)?
        } else {
            Self::decode_probed(path)?
        };

        if interleaved.is_empty() {
            return Err(anyhow!("No audio samples decoded from {:?}", path));
        }

        let mono = downmix(interleaved, channels);
        let samples = Resampler::resample(&mono, source_sr, target_sr)
            .with_context(|| format!("Failed to resample {:?} from {} Hz", path, source_sr))?;

        Ok(Waveform::new(samples, target_sr))
    }

    /// Read a WAV file with hound, returning interleaved samples
    fn decode_wav(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Corrupt float WAV data")?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .context("Corrupt PCM WAV data")?
            }
        };

        Ok((samples, spec.channels.max(1) as usize, spec.sample_rate))
    }

    /// Decode any symphonia-supported container
    fn decode_probed(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
        let src = File::open(path).with_context(|| format!("Failed to open audio file: {:?}", path))?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .with_context(|| format!("Unsupported audio format: {:?}", path))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No supported audio tracks found in {:?}", path))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| anyhow!("Unknown sample rate in {:?}", path))?;
        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Unsupported codec")?;

        let mut samples = Vec::new();
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(anyhow!("Error reading packet: {}", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count().max(1);
                    let needed = decoded.capacity() * channels;
                    if buffer.as_ref().map_or(true, |b| b.capacity() < needed) {
                        buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                    }
                    if let Some(buf) = buffer.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                // corrupted packet, keep going
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(anyhow!("Decode error: {}", e)),
            }
        }

        Ok((samples, channels, sample_rate))
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

/// Average interleaved frames down to one channel
fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
