//! Recording session module
//!
//! Synchronizes two independently delivered sample streams into one output:
//! - TimestampTracker decides which samples fall inside the session window
//! - EarlyAudioQueue holds audio that arrives before the first video frame
//! - RecordingSession writes samples and drives stop, timeout and finalization

pub mod config;
pub mod queue;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use queue::EarlyAudioQueue;
pub use session::{CompletionHandler, RecordingSession};
pub use state::{Admission, DropReason, FinishReason, RecordingPhase, SessionSnapshot, TimestampTracker};
