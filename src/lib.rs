//! # Tortoise Server - Voice-Cloning TTS over HTTP
//!
//! An HTTP service that clones a voice from a handful of uploaded reference
//! recordings and speaks arbitrary text in that voice.
//!
//! ## Features
//!
//! - **Instant Voice Cloning**: Register a voice from multipart-uploaded samples
//! - **Model Worker**: Tortoise inference over HTTP, with cached conditioning latents
//! - **Simulation Mode**: A placeholder tone whenever no model can serve a request
//! - **Flask-Compatible API**: Same endpoints and JSON shapes, plus request stats
//!
//! ## Embedding the server
//!
//! ```rust,ignore
//! use tortoise_server::server::{ServerConfig, TortoiseServer};
//!
//! let mut config = ServerConfig::default();
//! config.model.url = Some("http://127.0.0.1:8001".to_string());
//! TortoiseServer::new(config).run().await?;
//! ```
//!
//! ## Driving the router directly
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tortoise_server::server::{create_router, AppState, ServerConfig};
//! use tortoise_server::synthesis::SynthesisBackend;
//!
//! let state = AppState::new(ServerConfig::default(), SynthesisBackend::Placeholder);
//! let app = create_router(Arc::new(state));
//! ```

pub mod audio;
pub mod core;
pub mod model;
pub mod server;
pub mod synthesis;
pub mod voice;

// Core re-exports
pub use core::error::{ModelError, Result, ServiceError};

// Model re-exports
pub use model::{ConditioningLatents, Generation, ModelHealth, Quality, RemoteTortoise, SpeechModel};

// Synthesis re-exports
pub use synthesis::{SpeechDispatcher, SynthesisBackend, SynthesisMode, SynthesisOutcome};

// Voice re-exports
pub use voice::{VoiceEntry, VoiceRegistry, VoiceSummary};

// Server re-exports
pub use server::{create_router, AppState, ServerConfig, ServerVariant, TortoiseServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
