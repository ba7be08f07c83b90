//! Core framework pieces shared by every layer
//!
//! - Error types and the JSON failure payload

pub mod error;

pub use error::{ErrorBody, ModelError, Result, ServiceError};
