//! Voice Registry
//!
//! In-process store of cloned voices. Entries own the temp files their
//! samples were written to; removing an entry unlinks them. Nothing here is
//! persisted across restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audio::Waveform;
use crate::core::error::{Result, ServiceError};

/// One uploaded reference sample
#[derive(Debug, Clone)]
pub struct SampleRecord {
    /// Sanitized original filename
    pub filename: String,
    /// Where the upload was written
    pub path: PathBuf,
    /// Size on disk (bytes)
    pub size: u64,
    /// Decoded mono waveform, `None` when decoding failed
    pub waveform: Option<Arc<Waveform>>,
}

/// A cloned voice
#[derive(Debug, Clone)]
pub struct VoiceEntry {
    pub voice_id: String,
    pub user_id: String,
    pub samples: Vec<SampleRecord>,
    pub created_at: DateTime<Utc>,
    /// Whether the entry may be used for model synthesis
    pub ready_for_tts: bool,
    /// Temp files owned by this entry
    pub files: Vec<PathBuf>,
}

/// List/info projection of a voice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSummary {
    pub voice_id: String,
    pub user_id: String,
    pub samples_count: usize,
    pub created: bool,
    pub created_at: String,
    pub ready_for_tts: bool,
}

impl VoiceEntry {
    pub fn samples_count(&self) -> usize {
        self.samples.len()
    }

    /// Waveforms of every sample that decoded, in upload order
    pub fn usable_waveforms(&self) -> Vec<Arc<Waveform>> {
        self.samples
            .iter()
            .filter_map(|s| s.waveform.clone())
            .collect()
    }

    pub fn summary(&self) -> VoiceSummary {
        VoiceSummary {
            voice_id: self.voice_id.clone(),
            user_id: self.user_id.clone(),
            samples_count: self.samples_count(),
            created: true,
            created_at: self.created_at.to_rfc3339(),
            ready_for_tts: self.ready_for_tts,
        }
    }
}

/// Reject names that cannot serve as a voice id
pub fn validate_voice_name(voice_name: &str) -> Result<()> {
    if voice_name.trim().is_empty() {
        return Err(ServiceError::validation("voice_name", "No voice name provided"));
    }
    Ok(())
}

/// Voice registry
#[derive(Default)]
pub struct VoiceRegistry {
    voices: RwLock<HashMap<String, Arc<VoiceEntry>>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<VoiceEntry>>>> {
        self.voices
            .read()
            .map_err(|_| ServiceError::internal("voice registry lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<VoiceEntry>>>> {
        self.voices
            .write()
            .map_err(|_| ServiceError::internal("voice registry lock poisoned"))
    }

    /// Register a voice under `voice_name` and return its id
    ///
    /// An existing entry with the same id is replaced; files it owned that the
    /// new entry does not reuse are deleted.
    pub fn register(
        &self,
        user_id: &str,
        voice_name: &str,
        samples: Vec<SampleRecord>,
    ) -> Result<Arc<VoiceEntry>> {
        if samples.is_empty() {
            return Err(ServiceError::validation(
                "voice_sample",
                "No valid audio samples provided",
            ));
        }
        validate_voice_name(voice_name)?;

        let files = samples.iter().map(|s| s.path.clone()).collect::<Vec<_>>();
        let entry = Arc::new(VoiceEntry {
            voice_id: voice_name.to_string(),
            user_id: user_id.to_string(),
            samples,
            created_at: Utc::now(),
            ready_for_tts: true,
            files,
        });

        let replaced = self.write()?.insert(entry.voice_id.clone(), entry.clone());

        if let Some(old) = replaced {
            info!("Voice {} replaced", old.voice_id);
            let stale = old.files.iter().filter(|p| !entry.files.contains(p));
            remove_files(stale);
        }

        info!(
            "Voice registered: {} ({} samples, {} decoded)",
            entry.voice_id,
            entry.samples_count(),
            entry.usable_waveforms().len()
        );
        Ok(entry)
    }

    /// Insert a not-ready entry with no samples if `voice_id` is unknown
    pub fn ensure_placeholder(&self, voice_id: &str) -> Result<Arc<VoiceEntry>> {
        let mut voices = self.write()?;
        let entry = voices
            .entry(voice_id.to_string())
            .or_insert_with(|| {
                debug!("Creating placeholder voice {}", voice_id);
                Arc::new(VoiceEntry {
                    voice_id: voice_id.to_string(),
                    user_id: "default".to_string(),
                    samples: Vec::new(),
                    created_at: Utc::now(),
                    ready_for_tts: false,
                    files: Vec::new(),
                })
            });
        Ok(entry.clone())
    }

    /// Get voice by id
    pub fn get(&self, voice_id: &str) -> Result<Arc<VoiceEntry>> {
        self.read()?
            .get(voice_id)
            .cloned()
            .ok_or_else(|| ServiceError::voice_not_found(voice_id))
    }

    /// Summaries of every voice, oldest first
    pub fn list(&self) -> Result<Vec<VoiceSummary>> {
        let mut entries: Vec<Arc<VoiceEntry>> = self.read()?.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.voice_id.cmp(&b.voice_id))
        });
        Ok(entries.iter().map(|e| e.summary()).collect())
    }

    /// Remove a voice and delete its temp files
    pub fn delete(&self, voice_id: &str) -> Result<Arc<VoiceEntry>> {
        let removed = self
            .write()?
            .remove(voice_id)
            .ok_or_else(|| ServiceError::voice_not_found(voice_id))?;

        remove_files(removed.files.iter());
        info!("Voice deleted: {}", voice_id);
        Ok(removed)
    }

    pub fn count(&self) -> usize {
        self.read().map(|v| v.len()).unwrap_or(0)
    }
}

/// Unlink files, ignoring ones that are already gone
fn remove_files<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Build a sample record for a file already on disk
pub fn sample_from_path(path: &Path, filename: &str, waveform: Option<Waveform>) -> Result<SampleRecord> {
    let size = std::fs::metadata(path)
        .map_err(|e| ServiceError::io(path, e))?
        .len();
    Ok(SampleRecord {
        filename: filename.to_string(),
        path: path.to_path_buf(),
        size,
        waveform: waveform.map(Arc::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dir: &Path, name: &str, decoded: bool) -> SampleRecord {
        let path = dir.join(name);
        std::fs::write(&path, b"0123456789").unwrap();
        let wave = decoded.then(|| Waveform::new(vec![0.0; 10], 22050));
        sample_from_path(&path, name, wave).unwrap()
    }

    #[test]
    fn test_register_requires_samples() {
        let registry = VoiceRegistry::new();
        let err = registry.register("u", "v", Vec::new()).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
        assert_eq!(registry.count(), 0);
        assert!(registry.get("v").is_err());
    }

    #[test]
    fn test_register_requires_a_name() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();
        let err = registry
            .register("u", " \t", vec![sample(dir.path(), "a.wav", true)])
            .unwrap_err();
        assert_eq!(err.to_string(), "No voice name provided");
        assert!(validate_voice_name("v").is_ok());
    }

    #[test]
    fn test_register_counts_undecoded_samples() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();
        let samples = vec![
            sample(dir.path(), "a.wav", true),
            sample(dir.path(), "b.wav", false),
            sample(dir.path(), "c.wav", true),
        ];
        let entry = registry.register("alice", "alice_voice", samples).unwrap();

        assert_eq!(entry.samples_count(), 3);
        assert_eq!(entry.usable_waveforms().len(), 2);
        assert_eq!(entry.samples[0].size, 10);
        assert!(entry.ready_for_tts);

        let summary = registry.get("alice_voice").unwrap().summary();
        assert_eq!(summary.user_id, "alice");
        assert_eq!(summary.samples_count, 3);
    }

    #[test]
    fn test_delete_removes_entry_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();
        let samples = vec![sample(dir.path(), "a.wav", true), sample(dir.path(), "b.wav", false)];
        let paths: Vec<PathBuf> = samples.iter().map(|s| s.path.clone()).collect();
        registry.register("u", "v", samples).unwrap();

        registry.delete("v").unwrap();

        assert!(registry.list().unwrap().is_empty());
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(matches!(
            registry.delete("v").unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[test]
    fn test_reregister_replaces_and_cleans_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();
        let first = sample(dir.path(), "old.wav", true);
        let old_path = first.path.clone();
        registry.register("u", "v", vec![first]).unwrap();

        let second = sample(dir.path(), "new.wav", true);
        let new_path = second.path.clone();
        registry.register("u", "v", vec![second]).unwrap();

        assert_eq!(registry.count(), 1);
        assert!(!old_path.exists());
        assert!(new_path.exists());
    }

    #[test]
    fn test_placeholder_is_not_ready_and_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();

        let stub = registry.ensure_placeholder("default_voice").unwrap();
        assert!(!stub.ready_for_tts);
        assert_eq!(stub.samples_count(), 0);

        registry
            .register("u", "real", vec![sample(dir.path(), "a.wav", true)])
            .unwrap();
        let existing = registry.ensure_placeholder("real").unwrap();
        assert!(existing.ready_for_tts);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = VoiceRegistry::new();
        registry.register("u", "first", vec![sample(dir.path(), "1.wav", true)]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.register("u", "second", vec![sample(dir.path(), "2.wav", true)]).unwrap();

        let ids: Vec<String> = registry.list().unwrap().into_iter().map(|s| s.voice_id).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
