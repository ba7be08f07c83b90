//! Sample ingest
//!
//! Writes uploaded files into the temp directory and decodes them for
//! conditioning. A sample that fails to decode is still kept (without a
//! waveform) so the voice can be registered and inspected.
//!
//! Sample files are named `{voice}_{tag}_{filename}` with a fresh tag per
//! upload. Voice names that sanitize to the same prefix never share a file.

use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::AudioLoader;
use crate::core::error::{Result, ServiceError};
use crate::voice::registry::{sample_from_path, SampleRecord};

/// An uploaded file held in memory until the whole form has been read
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Writes and decodes uploaded samples
#[derive(Debug, Clone)]
pub struct SampleIngest {
    temp_dir: PathBuf,
    target_sample_rate: u32,
}

impl SampleIngest {
    pub fn new(temp_dir: impl Into<PathBuf>, target_sample_rate: u32) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            target_sample_rate,
        }
    }

    /// Path an upload will be written to: `{temp}/{prefix}_{filename}` or `{temp}/{filename}`
    pub fn upload_path(&self, prefix: Option<&str>, filename: &str) -> PathBuf {
        let filename = secure_filename(filename);
        let name = match prefix.map(secure_filename) {
            Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, filename),
            _ => filename,
        };
        self.temp_dir.join(name)
    }

    /// Write an upload to disk and return where it landed
    pub async fn persist(&self, prefix: Option<&str>, upload: &UploadedFile) -> Result<PathBuf> {
        let path = self.upload_path(prefix, &upload.filename);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| ServiceError::io(&path, e))?;
        Ok(path)
    }

    /// Persist and decode one voice sample
    pub async fn ingest(&self, voice_name: &str, upload: &UploadedFile) -> Result<SampleRecord> {
        let prefix = format!("{}_{}", secure_filename(voice_name), Uuid::new_v4().simple());
        let path = self.persist(Some(&prefix), upload).await?;
        let filename = secure_filename(&upload.filename);
        let target_sr = self.target_sample_rate;

        let record = tokio::task::spawn_blocking(move || {
            let waveform = match AudioLoader::load(&path, target_sr) {
                Ok(wave) => {
                    info!("Loaded audio sample: {} ({:.2}s)", filename, wave.duration_secs());
                    Some(wave)
                }
                Err(e) => {
                    warn!("Failed to decode audio sample {}: {:#}", filename, e);
                    None
                }
            };
            sample_from_path(&path, &filename, waveform)
        })
        .await??;

        Ok(record)
    }

    /// Ingest every upload for a voice, in order
    pub async fn ingest_all(&self, voice_name: &str, uploads: &[UploadedFile]) -> Result<Vec<SampleRecord>> {
        let mut records = Vec::with_capacity(uploads.len());
        for upload in uploads {
            records.push(self.ingest(voice_name, upload).await?);
        }
        Ok(records)
    }
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Path separators become word breaks, runs of whitespace become `_`, and
/// anything outside `[A-Za-z0-9._-]` is dropped. Leading and trailing dots
/// and underscores are stripped; an empty result becomes `upload`.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
