//! Writer status, errors and track settings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lifecycle status reported by a container writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterStatus {
    /// Created but not started
    #[default]
    Unknown,
    /// Accepting samples
    Writing,
    /// Finalized successfully
    Completed,
    /// Failed; see the writer's error
    Failed,
    /// Cancelled before finalizing
    Cancelled,
}

impl WriterStatus {
    pub fn descriptor(&self) -> &'static str {
        match self {
            WriterStatus::Unknown => "unknown",
            WriterStatus::Writing => "writing",
            WriterStatus::Completed => "completed",
            WriterStatus::Failed => "failed",
            WriterStatus::Cancelled => "cancelled",
        }
    }
}

/// Error reported by a container or track writer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriterError {
    #[error("destination not writable: {0}")]
    Destination(String),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("container error: {0}")]
    Container(String),
}

/// Settings for one track writer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    /// Encoder options, passed through to the writer untouched
    #[serde(default)]
    pub output_settings: Map<String, Value>,

    /// Samples arrive from a live source and must not be held back
    #[serde(default = "default_real_time")]
    pub expects_media_data_in_real_time: bool,

    /// Description of the source format, for writers that need a hint
    #[serde(default)]
    pub source_format_hint: Option<String>,
}

fn default_real_time() -> bool {
    true
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl TrackSettings {
    pub fn new(output_settings: Map<String, Value>) -> Self {
        Self {
            output_settings,
            expects_media_data_in_real_time: true,
            source_format_hint: None,
        }
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_format_hint = Some(hint.into());
        self
    }

    /// Whether any encoder options were provided
    pub fn is_empty(&self) -> bool {
        self.output_settings.is_empty()
    }
}
