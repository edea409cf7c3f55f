//! Capture pipeline inputs
//!
//! The recorder does not capture anything itself; this module defines what the
//! capture pipeline hands to it.

pub mod traits;

pub use traits::{EncodedSample, MediaTime, SyncClock, SystemClock, TrackType};
