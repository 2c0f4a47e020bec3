//! Error types for Synheart Reps
//!
//! Frame processing never fails: missing joints degrade to "not active" and "no
//! repetition". These errors cover the fallible edges around the engine:
//! parsing, configuration and mode selection.

use thiserror::Error;

/// Errors that can occur outside the per-frame hot path
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown exercise mode: {0}")]
    UnknownMode(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
