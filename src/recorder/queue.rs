//! Early audio queue
//!
//! Audio that arrives before the first video frame has fixed the session start
//! is held here and resolved once a start timestamp exists.

use crate::capture::{EncodedSample, MediaTime};
use crate::writer::TrackWriter;

/// Queue length at which waiting for the first video frame is worth a warning
pub const EARLY_AUDIO_WARN_LEN: usize = 512;

/// Result of one flush pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub written: usize,
    pub dropped: usize,
    pub remaining: usize,
    /// Latest timestamp written during this pass
    pub last_written: Option<MediaTime>,
}

#[derive(Debug, Default)]
pub struct EarlyAudioQueue {
    samples: Vec<EncodedSample>,
}

impl EarlyAudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a sample. Returns true when this sample filled the queue up to
    /// [`EARLY_AUDIO_WARN_LEN`].
    pub fn enqueue(&mut self, sample: EncodedSample) -> bool {
        self.samples.push(sample);
        self.samples.len() == EARLY_AUDIO_WARN_LEN
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resolve every queued sample at most once.
    ///
    /// Samples before `start` are dropped, written samples are removed, and
    /// samples the writer has no room for stay queued for the next pass.
    pub fn flush(&mut self, start: MediaTime, writer: &dyn TrackWriter) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();

        self.samples.retain(|sample| {
            let timestamp = sample.presentation_timestamp();
            if timestamp < start {
                tracing::debug!("Dropping queued audio buffer at {} (before start {})", timestamp, start);
                outcome.dropped += 1;
                return false;
            }
            if !writer.is_ready_for_more_media_data() {
                return true;
            }

            tracing::debug!("Writing queued AUDIO buffer at {}...", timestamp);
            if writer.append(sample) {
                outcome.written += 1;
                outcome.last_written = Some(outcome.last_written.map_or(timestamp, |t| t.max(timestamp)));
                false
            } else {
                true
            }
        });

        outcome.remaining = self.samples.len();
        outcome
    }
}
