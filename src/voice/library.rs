//! Model voice directory
//!
//! When a real model is loaded, each cloned voice's samples are also copied to
//! `{temp}/tortoise_custom_voices/{folder}/` so the worker can load them as a
//! named voice. The folder is the voice id with every byte outside
//! `[A-Za-z0-9-]` written as `_XX`, so distinct ids never share a folder.

use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::error::{Result, ServiceError};
use crate::voice::registry::VoiceEntry;

/// Directory of per-voice sample folders
#[derive(Debug, Clone)]
pub struct VoiceLibrary {
    root: PathBuf,
}

impl VoiceLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Folder for one voice
    pub fn voice_dir(&self, voice_id: &str) -> PathBuf {
        self.root.join(folder_name(voice_id))
    }

    /// Copy every sample of `entry` into its folder
    pub async fn mirror(&self, entry: &VoiceEntry) -> Result<PathBuf> {
        let dir = self.voice_dir(&entry.voice_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::io(&dir, e))?;

        for sample in &entry.samples {
            let name = sample
                .path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| sample.filename.clone().into());
            let dest = dir.join(name);
            tokio::fs::copy(&sample.path, &dest)
                .await
                .map_err(|e| ServiceError::io(&dest, e))?;
        }

        info!("Voice samples copied to model directory: {}", dir.display());
        Ok(dir)
    }

    /// Remove a voice's folder if present
    pub async fn remove(&self, voice_id: &str) {
        let dir = self.voice_dir(voice_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => info!("Removed model voice directory {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }
}

/// Escape a voice id into a single path component
fn folder_name(voice_id: &str) -> String {
    let mut name = String::with_capacity(voice_id.len());
    for byte in voice_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(byte as char);
        } else {
            let _ = write!(name, "_{:02X}", byte);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::registry::sample_from_path;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mirror_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v_a.wav");
        std::fs::write(&src, b"abc").unwrap();
        let entry = VoiceEntry {
            voice_id: "v".to_string(),
            user_id: "u".to_string(),
            samples: vec![sample_from_path(&src, "a.wav", None).unwrap()],
            created_at: Utc::now(),
            ready_for_tts: true,
            files: vec![src.clone()],
        };

        let library = VoiceLibrary::new(tmp.path().join("tortoise_custom_voices"));
        let dir = library.mirror(&entry).await.unwrap();
        assert_eq!(std::fs::read(dir.join("v_a.wav")).unwrap(), b"abc");

        library.remove("v").await;
        assert!(!dir.exists());
        // second removal is a no-op
        library.remove("v").await;
    }

    #[test]
    fn test_folder_names_are_distinct() {
        assert_eq!(folder_name("alice-2"), "alice-2");
        assert_eq!(folder_name("a b"), "a_20b");
        assert_eq!(folder_name("a_b"), "a_5Fb");
        assert_eq!(folder_name("../x"), "_2E_2E_2Fx");
        assert_ne!(folder_name("caf\u{e9}"), folder_name("caf"));
    }

    #[tokio::test]
    async fn test_removing_one_voice_keeps_a_similar_one() {
        let tmp = tempfile::tempdir().unwrap();
        let library = VoiceLibrary::new(tmp.path().join("tortoise_custom_voices"));
        let spaced = library.voice_dir("a b");
        let underscored = library.voice_dir("a_b");
        assert_ne!(spaced, underscored);

        std::fs::create_dir_all(&spaced).unwrap();
        std::fs::create_dir_all(&underscored).unwrap();
        library.remove("a b").await;
        assert!(!spaced.exists());
        assert!(underscored.exists());
    }
}
