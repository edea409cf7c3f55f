//! Capture pipeline types
//!
//! Timestamps, samples and the synchronization clock handed to a recording
//! session by the capture pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Instant;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A point on the shared synchronization clock, in nanoseconds.
///
/// Values may be negative: a delayed pipeline can report samples that were
/// captured before the clock origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000_000)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * NANOS_PER_SEC).round() as i64)
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn seconds(&self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds())
    }
}

/// Which track of the output a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
        }
    }
}

/// An already-encoded media sample, ready to be handed to a track writer
#[derive(Debug, Clone)]
pub struct EncodedSample {
    /// Track the sample was produced for
    pub track: TrackType,

    /// Presentation timestamp on the shared clock
    pub pts: MediaTime,

    /// Sample duration, if the encoder reported one
    pub duration: Option<MediaTime>,

    /// Encoded payload
    pub data: Vec<u8>,

    /// Whether the payload has been fully produced
    pub data_ready: bool,
}

impl EncodedSample {
    /// Create a ready sample with the given payload
    pub fn new(track: TrackType, pts: MediaTime, data: Vec<u8>) -> Self {
        Self {
            track,
            pts,
            duration: None,
            data,
            data_ready: true,
        }
    }

    pub fn with_duration(mut self, duration: MediaTime) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn presentation_timestamp(&self) -> MediaTime {
        self.pts
    }

    pub fn is_data_ready(&self) -> bool {
        self.data_ready
    }
}

/// Monotonic clock shared by the capture pipeline and the recorder.
///
/// All sample timestamps passed to a session must be on this clock.
pub trait SyncClock: Send + Sync {
    fn now(&self) -> MediaTime;
}

/// Clock backed by `Instant`, with its origin at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncClock for SystemClock {
    fn now(&self) -> MediaTime {
        let elapsed = self.origin.elapsed().as_nanos();
        MediaTime::from_nanos(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}
