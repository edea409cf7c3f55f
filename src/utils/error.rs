//! Error types and handling
//!
//! Errors surfaced by a recording session, either synchronously from setup
//! calls or through the completion callback.

use crate::writer::WriterError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recorder-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Failed to prepare recorder: {0}")]
    RecorderInit(String),

    #[error("Writer failed: {0}")]
    WriteFailure(#[from] WriterError),

    #[error("Invalid track settings: {0}")]
    InvalidTrackSettings(String),

    #[error("Track writer already initialized: {0}")]
    TrackAlreadyInitialized(String),

    #[error("Session was already prepared")]
    AlreadyPrepared,

    #[error("No tokio runtime available to drive the session")]
    NoRuntime,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error response for orchestrators that cross a process or FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<RecorderError> for ErrorResponse {
    fn from(error: RecorderError) -> Self {
        ErrorResponse::from(&error)
    }
}

impl From<&RecorderError> for ErrorResponse {
    fn from(error: &RecorderError) -> Self {
        let code = match error {
            RecorderError::RecorderInit(_) => "RECORDER_INIT_ERROR",
            RecorderError::WriteFailure(_) => "WRITE_FAILURE",
            RecorderError::InvalidTrackSettings(_) => "INVALID_TRACK_SETTINGS",
            RecorderError::TrackAlreadyInitialized(_) => "TRACK_ALREADY_INITIALIZED",
            RecorderError::AlreadyPrepared => "ALREADY_PREPARED",
            RecorderError::NoRuntime => "NO_RUNTIME",
            RecorderError::Io(_) => "IO_ERROR",
            RecorderError::Serialization(_) => "SERIALIZATION_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
