//! Sync Recorder - clock-synchronized video/audio recording sessions.
//!
//! A [`RecordingSession`] takes already-encoded video and audio samples from a
//! capture pipeline, gates them against the session window on a shared clock,
//! and hands them to an external container writer. Late frames are admitted
//! past a stop request until both tracks end together.

pub mod capture;
pub mod recorder;
pub mod utils;
pub mod writer;

#[cfg(test)]
mod testing;

pub use capture::{EncodedSample, MediaTime, SyncClock, SystemClock, TrackType};
pub use recorder::{FinishReason, RecordingPhase, RecordingSession, SessionConfig, SessionSnapshot};
pub use utils::{ErrorResponse, RecorderError, RecorderResult};
pub use writer::{ContainerWriter, TrackSettings, TrackWriter, WriterError, WriterStatus};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a tracing subscriber for applications embedding the recorder.
///
/// Honors `RUST_LOG`; defaults to debug output for this crate.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sync_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    match result {
        Ok(()) => tracing::info!("Starting Sync Recorder v{}", env!("CARGO_PKG_VERSION")),
        Err(e) => tracing::debug!("Tracing subscriber already installed: {}", e),
    }
}
