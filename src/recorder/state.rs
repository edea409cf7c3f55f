//! Recording state management
//!
//! Session timestamps, the per-sample admission decision and the derived
//! recording phase.

use crate::capture::{MediaTime, TrackType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of a recording session, derived from its timestamps and finish state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingPhase {
    /// `prepare` has not succeeded yet
    #[default]
    NotStarted,
    /// Accepting samples
    Writing,
    /// Stop requested, draining late frames
    Stopping,
    /// Container writer is finalizing
    Finishing,
    /// Completion callback has been (or is being) invoked
    Finished,
}

/// What triggered finalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinishReason {
    /// Both tracks wrote their last frame
    Completed,
    /// The grace window after `stop` elapsed
    StopTimeout,
    /// The container writer failed mid-session
    WriteFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishState {
    Active,
    Finishing,
    Finished,
}

/// Why a sample was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Session has no init timestamp yet
    NotStarted,
    /// Sample was captured before the session was prepared
    BeforeInit { delay: MediaTime },
    /// Track already wrote its last frame after the stop boundary
    AfterLastFrame,
}

/// Outcome of the timestamp checks for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Inside the session window
    Write,
    /// Past the stop boundary, but behind the other track
    CatchUp,
    /// Past the stop boundary; this is the track's last sample
    WriteFinal,
    Drop(DropReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Drop(_))
    }
}

/// Session timestamps and last-frame bookkeeping.
///
/// Pure state: the session mutates it under its lock.
#[derive(Debug, Clone, Default)]
pub struct TimestampTracker {
    init: Option<MediaTime>,
    start: Option<MediaTime>,
    stop: Option<MediaTime>,
    last_video: Option<MediaTime>,
    last_audio: Option<MediaTime>,
    has_written_last_video_frame: bool,
    has_written_last_audio_frame: bool,
}

impl TimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&self) -> Option<MediaTime> {
        self.init
    }

    pub fn start(&self) -> Option<MediaTime> {
        self.start
    }

    pub fn stop(&self) -> Option<MediaTime> {
        self.stop
    }

    pub fn last_written(&self, track: TrackType) -> Option<MediaTime> {
        match track {
            TrackType::Video => self.last_video,
            TrackType::Audio => self.last_audio,
        }
    }

    pub fn has_written_last_frame(&self, track: TrackType) -> bool {
        match track {
            TrackType::Video => self.has_written_last_video_frame,
            TrackType::Audio => self.has_written_last_audio_frame,
        }
    }

    /// Record the init timestamp. Returns false if it was already set.
    pub fn mark_initialized(&mut self, at: MediaTime) -> bool {
        if self.init.is_some() {
            return false;
        }
        self.init = Some(at);
        true
    }

    /// Record the stop boundary. Returns false if a stop was already requested.
    pub fn request_stop(&mut self, at: MediaTime) -> bool {
        if self.stop.is_some() {
            return false;
        }
        self.stop = Some(at);
        true
    }

    /// Set the start timestamp from the first admitted video sample.
    /// Returns true if this call started the session.
    pub fn begin_session(&mut self, at: MediaTime) -> bool {
        if self.start.is_some() {
            return false;
        }
        self.start = Some(at);
        true
    }

    /// Flag the track as having written its last frame
    pub fn mark_track_complete(&mut self, track: TrackType) {
        match track {
            TrackType::Video => self.has_written_last_video_frame = true,
            TrackType::Audio => self.has_written_last_audio_frame = true,
        }
    }

    pub fn record_written(&mut self, track: TrackType, at: MediaTime) {
        let last = match track {
            TrackType::Video => &mut self.last_video,
            TrackType::Audio => &mut self.last_audio,
        };
        *last = Some(last.map_or(at, |prev| prev.max(at)));
    }

    pub fn both_tracks_complete(&self) -> bool {
        self.has_written_last_video_frame && self.has_written_last_audio_frame
    }

    /// Decide whether a sample at `t` may be written.
    ///
    /// Past the stop boundary a track keeps writing while it is strictly
    /// behind the other track's last written sample; otherwise it writes
    /// exactly one more sample and closes.
    pub fn admit(&self, track: TrackType, t: MediaTime, has_audio_track: bool) -> Admission {
        let Some(init) = self.init else {
            return Admission::Drop(DropReason::NotStarted);
        };
        if t < init {
            return Admission::Drop(DropReason::BeforeInit { delay: init - t });
        }
        let Some(stop) = self.stop else {
            return Admission::Write;
        };
        if t < stop {
            return Admission::Write;
        }

        let (behind, closed) = match track {
            TrackType::Video => (
                has_audio_track && self.last_audio.is_some_and(|audio| t < audio),
                self.has_written_last_video_frame,
            ),
            TrackType::Audio => (
                self.last_video.is_some_and(|video| t < video),
                self.has_written_last_audio_frame,
            ),
        };

        if behind {
            Admission::CatchUp
        } else if closed {
            Admission::Drop(DropReason::AfterLastFrame)
        } else {
            Admission::WriteFinal
        }
    }

    /// Last written video timestamp minus start, in seconds
    pub fn elapsed_duration(&self) -> f64 {
        match (self.last_video, self.start) {
            (Some(last), Some(start)) => (last - start).seconds(),
            _ => 0.0,
        }
    }

    pub(crate) fn phase(&self, finish_state: FinishState) -> RecordingPhase {
        match finish_state {
            FinishState::Finished => RecordingPhase::Finished,
            FinishState::Finishing => RecordingPhase::Finishing,
            FinishState::Active if self.init.is_none() => RecordingPhase::NotStarted,
            FinishState::Active if self.stop.is_some() => RecordingPhase::Stopping,
            FinishState::Active => RecordingPhase::Writing,
        }
    }
}

/// Point-in-time view of a session, for orchestrators and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: RecordingPhase,
    pub output_location: String,
    pub init_secs: Option<f64>,
    pub start_secs: Option<f64>,
    pub stop_secs: Option<f64>,
    pub last_video_secs: Option<f64>,
    pub last_audio_secs: Option<f64>,
    pub elapsed_secs: f64,
    pub queued_audio: usize,
    pub finish_reason: Option<FinishReason>,
    pub created_at: DateTime<Utc>,
}
