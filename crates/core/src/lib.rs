//! kbchat core library
//!
//! Foundational utilities shared by every kbchat crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ConfidencePolicy, RagSettings};
pub use error::{AppError, AppResult};
