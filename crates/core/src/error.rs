//! Error types for kbchat.
//!
//! One enum covers every failure category in the workspace. The variants line
//! up with how a failure is treated by callers: configuration faults abort
//! startup, retrieval and generation faults fail the current question, and
//! ingestion faults fail an index build.

use thiserror::Error;

/// Unified error type for kbchat.
///
/// A low-confidence retrieval is not represented here: it is a normal outcome
/// of the answer workflow and produces the fallback answer instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credential, missing index, unreadable config file
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The retriever could not produce passages for a question
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The generator backend failed (transport, auth, quota, malformed reply)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Ingestion and index-build errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt definition and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error must abort process startup.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
