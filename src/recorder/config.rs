//! Session configuration

use crate::utils::RecorderResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How long to wait for late frames after `stop` before forcing finalization
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 4000;

/// Configuration for a recording session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Grace window after `stop`, in milliseconds
    pub stop_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Load configuration from a JSON file, falling back to defaults if the
    /// file does not exist
    pub fn from_json_file(path: &Path) -> RecorderResult<Self> {
        if !path.exists() {
            tracing::info!("No session config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&contents)?;

        tracing::info!("Loaded session config from {:?}", path);
        Ok(config)
    }
}
