//! Writer trait definitions
//!
//! Muxing and encoding live outside this crate. A session drives them through
//! these two traits.

use super::types::{TrackSettings, WriterError, WriterStatus};
use crate::capture::{EncodedSample, MediaTime, TrackType};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// A sink for the samples of one track
pub trait TrackWriter: Send + Sync {
    /// Which track this writer accepts
    fn track(&self) -> TrackType;

    /// Whether the writer can take another sample right now
    fn is_ready_for_more_media_data(&self) -> bool;

    /// Append a sample. Returns false if the writer rejected it.
    fn append(&self, sample: &EncodedSample) -> bool;

    /// No more samples will be appended
    fn mark_as_finished(&self);
}

/// Output container owning the track writers
#[async_trait]
pub trait ContainerWriter: Send + Sync {
    /// Where the output is written
    fn output_location(&self) -> PathBuf;

    /// Create a track writer and attach it to the container
    fn add_track(
        &self,
        track: TrackType,
        settings: &TrackSettings,
    ) -> Result<Arc<dyn TrackWriter>, WriterError>;

    /// Open the destination and move to `WriterStatus::Writing`
    fn start_writing(&self) -> Result<(), WriterError>;

    /// Start the output timeline at the given source time
    fn start_session(&self, at: MediaTime);

    fn status(&self) -> WriterStatus;

    /// Error for a `Failed` status
    fn error(&self) -> Option<WriterError>;

    /// Finalize the output. Resolves once the status is terminal.
    async fn finish_writing(&self);

    /// Abandon the output without finalizing it
    fn cancel_writing(&self);
}
