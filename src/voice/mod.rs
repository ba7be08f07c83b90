//! Voice management
//!
//! - Registry of cloned voices and their samples
//! - Ingest of uploaded reference audio
//! - Model-side voice directory

pub mod ingest;
pub mod library;
pub mod registry;

pub use ingest::{secure_filename, SampleIngest, UploadedFile};
pub use library::VoiceLibrary;
pub use registry::{validate_voice_name, SampleRecord, VoiceEntry, VoiceRegistry, VoiceSummary};
