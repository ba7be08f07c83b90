//! Voice-Cloning HTTP Server
//!
//! Flask-compatible REST surface over the voice registry and the synthesis
//! dispatcher:
//! - Instant voice cloning from uploaded samples
//! - Speech generation with model or placeholder audio
//! - Gradio-style predict, upload and file endpoints
//! - Health, test and request statistics

pub mod config;
pub mod middleware;
pub mod routes;
pub mod server_core;
pub mod types;

pub use config::{LoggingConfig, ModelConfig, ServerConfig, ServerVariant, StorageConfig};
pub use middleware::{MetricsState, RequestTally, RouteTally};
pub use routes::files::SYNTHESIS_MODE_HEADER;
pub use server_core::{create_router, AppState, TortoiseServer};
pub use types::*;
