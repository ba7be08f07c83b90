//! Sample rate conversion using rubato
//!
//! Uploaded references come in at whatever rate the browser recorded
//! (44.1/48 kHz typically) and have to be brought to the model's 22050 Hz.

use anyhow::{anyhow, Context, Result};
use rubato::{
    calculate_cutoff, Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

/// Input frames fed to rubato per call
const CHUNK_SIZE: usize = 1024;

/// Upper bound on zero-filled flush passes used to drain the filter delay
const MAX_FLUSHES: usize = 8;

/// Audio resampler using sinc interpolation
pub struct Resampler;

impl Resampler {
    /// Resample mono audio from `from_sr` to `to_sr`
    ///
    /// The output is delay-compensated and trimmed to
    /// `round(len * to_sr / from_sr)` samples.
    pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>> {
        if from_sr == 0 || to_sr == 0 {
            return Err(anyhow!("Invalid sample rate conversion {} -> {}", from_sr, to_sr));
        }
        if from_sr == to_sr {
            return Ok(samples.to_vec());
        }
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let ratio = to_sr as f64 / from_sr as f64;
        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.1, Self::parameters(), CHUNK_SIZE, 1)
            .context("Failed to create resampler")?;

        let expected = (samples.len() as f64 * ratio).round() as usize;
        let delay = resampler.output_delay();
        let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

        let mut chunks = samples.chunks_exact(CHUNK_SIZE);
        for chunk in &mut chunks {
            let out = resampler.process(std::slice::from_ref(&chunk), None).context("Resampling failed")?;
            output.extend_from_slice(&out[0]);
        }

        let rest = chunks.remainder();
        if !rest.is_empty() {
            let out = resampler
                .process_partial(Some(std::slice::from_ref(&rest)), None)
                .context("Resampling tail failed")?;
            output.extend_from_slice(&out[0]);
        }

        let mut flushes = 0;
        while output.len() < delay + expected && flushes < MAX_FLUSHES {
            let out = resampler
                .process_partial(None::<&[&[f32]]>, None)
                .context("Resampler flush failed")?;
            output.extend_from_slice(&out[0]);
            flushes += 1;
        }

        Ok(output.into_iter().skip(delay).take(expected).collect())
    }

    fn parameters() -> SincInterpolationParameters {
        let sinc_len = 128;
        let window = WindowFunction::BlackmanHarris2;
        SincInterpolationParameters {
            sinc_len,
            f_cutoff: calculate_cutoff(sinc_len, window),
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window,
        }
    }
}
