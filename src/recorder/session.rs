//! Recording session
//!
//! Writes video and audio samples into one container, using the shared
//! synchronization clock rather than arrival order to decide what belongs in
//! the output. Late frames (e.g. from stabilization delay) are trimmed at the
//! start and admitted past the stop boundary until both tracks end together.

use super::config::SessionConfig;
use super::queue::EarlyAudioQueue;
use super::state::{
    Admission, DropReason, FinishReason, FinishState, RecordingPhase, SessionSnapshot,
    TimestampTracker,
};
use crate::capture::{EncodedSample, MediaTime, SyncClock, TrackType};
use crate::utils::{RecorderError, RecorderResult};
use crate::writer::{ContainerWriter, TrackSettings, TrackWriter, WriterStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Invoked exactly once per session with the final writer status
pub type CompletionHandler =
    Box<dyn FnOnce(&RecordingSession, WriterStatus, Option<RecorderError>) + Send>;

/// Side effect decided under the lock, run after releasing it
enum FinishAction {
    None,
    /// Container already left the writing state
    Report(CompletionHandler),
    /// Finalize the container, then report
    Finalize(CompletionHandler),
}

struct SessionInner {
    video_writer: Option<Arc<dyn TrackWriter>>,
    audio_writer: Option<Arc<dyn TrackWriter>>,
    timestamps: TimestampTracker,
    audio_queue: EarlyAudioQueue,
    finish_state: FinishState,
    finish_reason: Option<FinishReason>,
    stop_timeout: Option<JoinHandle<()>>,
    completion: Option<CompletionHandler>,
}

impl SessionInner {
    fn writer(&self, track: TrackType) -> Option<Arc<dyn TrackWriter>> {
        match track {
            TrackType::Video => self.video_writer.clone(),
            TrackType::Audio => self.audio_writer.clone(),
        }
    }
}

struct SessionShared {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: SessionConfig,
    container: Arc<dyn ContainerWriter>,
    runtime: Handle,
    inner: Mutex<SessionInner>,
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        if let Some(timeout) = self.inner.get_mut().stop_timeout.take() {
            timeout.abort();
        }
        if self.container.status() == WriterStatus::Writing {
            tracing::info!("Session {} dropped while writing, cancelling container writer...", self.id);
            self.container.cancel_writing();
        }
    }
}

/// Records synchronized video and audio samples into a container writer.
///
/// Cheap to clone; capture threads for each track, the stop timeout and the
/// orchestrator all share one session.
#[derive(Clone)]
pub struct RecordingSession {
    shared: Arc<SessionShared>,
}

impl RecordingSession {
    /// Create a session writing into `container`.
    ///
    /// Must be called from within a tokio runtime; the stop timeout and the
    /// container finalization run on it.
    pub fn new<F>(
        container: Arc<dyn ContainerWriter>,
        config: SessionConfig,
        completion: F,
    ) -> RecorderResult<Self>
    where
        F: FnOnce(&RecordingSession, WriterStatus, Option<RecorderError>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| RecorderError::NoRuntime)?;
        let id = Uuid::new_v4();

        tracing::info!("Creating recording session {} for {:?}", id, container.output_location());

        Ok(Self {
            shared: Arc::new(SessionShared {
                id,
                created_at: Utc::now(),
                config,
                container,
                runtime,
                inner: Mutex::new(SessionInner {
                    video_writer: None,
                    audio_writer: None,
                    timestamps: TimestampTracker::new(),
                    audio_queue: EarlyAudioQueue::new(),
                    finish_state: FinishState::Active,
                    finish_reason: None,
                    stop_timeout: None,
                    completion: Some(Box::new(completion)),
                }),
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Where the container writes its output
    pub fn output_location(&self) -> PathBuf {
        self.shared.container.output_location()
    }

    /// Seconds between the first and the last written video frame
    pub fn elapsed_duration(&self) -> f64 {
        self.shared.inner.lock().timestamps.elapsed_duration()
    }

    pub fn phase(&self) -> RecordingPhase {
        let inner = self.shared.inner.lock();
        inner.timestamps.phase(inner.finish_state)
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.shared.inner.lock().finish_reason
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock();
        let timestamps = &inner.timestamps;
        let secs = |t: Option<MediaTime>| t.map(|t| t.seconds());

        SessionSnapshot {
            id: self.shared.id,
            phase: timestamps.phase(inner.finish_state),
            output_location: self.output_location().to_string_lossy().to_string(),
            init_secs: secs(timestamps.init()),
            start_secs: secs(timestamps.start()),
            stop_secs: secs(timestamps.stop()),
            last_video_secs: secs(timestamps.last_written(TrackType::Video)),
            last_audio_secs: secs(timestamps.last_written(TrackType::Audio)),
            elapsed_secs: timestamps.elapsed_duration(),
            queued_audio: inner.audio_queue.len(),
            finish_reason: inner.finish_reason,
            created_at: self.shared.created_at,
        }
    }

    /// Add the video track. Settings must not be empty.
    pub fn initialize_video_writer(&self, settings: TrackSettings) -> RecorderResult<()> {
        if settings.is_empty() {
            tracing::error!("Tried to initialize video writer with empty settings!");
            return Err(RecorderError::InvalidTrackSettings(
                "video writer requires encoder settings".to_string(),
            ));
        }
        self.initialize_track(TrackType::Video, settings)
    }

    /// Add the audio track. Empty settings select the writer's defaults.
    pub fn initialize_audio_writer(&self, settings: TrackSettings) -> RecorderResult<()> {
        self.initialize_track(TrackType::Audio, settings)
    }

    fn initialize_track(&self, track: TrackType, settings: TrackSettings) -> RecorderResult<()> {
        let mut inner = self.shared.inner.lock();

        if inner.timestamps.init().is_some() {
            tracing::error!("Tried to add {} writer after the session was prepared!", track);
            return Err(RecorderError::AlreadyPrepared);
        }
        if inner.writer(track).is_some() {
            tracing::error!("Tried to add {} writer twice!", track);
            return Err(RecorderError::TrackAlreadyInitialized(track.to_string()));
        }

        if settings.is_empty() {
            tracing::info!("Initializing {} writer with default settings...", track);
        } else {
            tracing::info!("Initializing {} writer with settings: {:?}", track, settings.output_settings);
        }

        let writer = self
            .shared
            .container
            .add_track(track, &settings)
            .map_err(|e| RecorderError::RecorderInit(format!("failed to add {track} track: {e}")))?;

        match track {
            TrackType::Video => inner.video_writer = Some(writer),
            TrackType::Audio => inner.audio_writer = Some(writer),
        }

        tracing::info!("Initialized {} writer.", track);
        Ok(())
    }

    /// Start the container writer at the current time of `clock`.
    ///
    /// All samples passed to [`append_buffer`](Self::append_buffer) must be on
    /// this clock. The clock may already be ahead of the first samples if the
    /// pipeline is delayed; those samples are skipped.
    pub fn prepare(&self, clock: &dyn SyncClock) -> RecorderResult<()> {
        let mut inner = self.shared.inner.lock();
        let now = clock.now();

        if inner.timestamps.init().is_some() {
            tracing::warn!("Tried to prepare session {} twice!", self.shared.id);
            return Err(RecorderError::AlreadyPrepared);
        }

        tracing::info!("Preparing container writer at {}...", now);

        if let Err(e) = self.shared.container.start_writing() {
            tracing::error!("Failed to prepare container writer: {}", e);
            return Err(RecorderError::RecorderInit(e.to_string()));
        }
        inner.timestamps.mark_initialized(now);

        tracing::info!("Container writer prepared!");

        if inner.audio_writer.is_none() {
            // No audio track, so there is no last audio frame to wait for.
            inner.timestamps.mark_track_complete(TrackType::Audio);
        }
        Ok(())
    }

    /// Request the session to stop at the current time of `clock`.
    ///
    /// Late frames are still written until both tracks have caught up with
    /// each other, or until the stop timeout forces finalization.
    pub fn stop(&self, clock: &dyn SyncClock) {
        let mut inner = self.shared.inner.lock();
        let now = clock.now();

        if inner.timestamps.init().is_none() {
            tracing::warn!("Tried to stop session {} before it was prepared", self.shared.id);
            return;
        }
        if inner.finish_state != FinishState::Active {
            tracing::warn!("Tried to stop session {} while it is finishing", self.shared.id);
            return;
        }
        if !inner.timestamps.request_stop(now) {
            tracing::warn!(
                "Stop already requested at {}, ignoring stop at {}",
                inner.timestamps.stop().unwrap_or(now),
                now
            );
            return;
        }

        tracing::info!(
            "Requesting stop at {} for container writer with status \"{}\"...",
            now,
            self.shared.container.status().descriptor()
        );

        // The timeout keeps the session alive so a stopped session still
        // finalizes after the orchestrator drops its handles.
        let session = self.clone();
        let timeout = self.shared.config.stop_timeout();
        inner.stop_timeout = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            session.on_stop_timeout();
        }));
    }

    fn on_stop_timeout(&self) {
        {
            let mut inner = self.shared.inner.lock();
            // This task is the one running; nothing left to cancel.
            inner.stop_timeout = None;
            if inner.finish_state == FinishState::Active {
                tracing::error!(
                    "Waited {:.1} seconds but no late frames came in, aborting capture...",
                    self.shared.config.stop_timeout().as_secs_f64()
                );
            }
        }
        self.finish(FinishReason::StopTimeout);
    }

    /// Append an encoded sample to its track.
    ///
    /// Never fails: rejected samples are dropped, and writer failures are
    /// reported through the completion callback.
    pub fn append_buffer(&self, sample: EncodedSample, track: TrackType) {
        let action = {
            let mut inner = self.shared.inner.lock();
            self.admit_and_write(&mut inner, sample, track)
        };
        self.run_finish(action);
    }

    fn admit_and_write(
        &self,
        inner: &mut SessionInner,
        sample: EncodedSample,
        track: TrackType,
    ) -> FinishAction {
        // 1. Check the session and the sample can take data at all
        if inner.timestamps.init().is_none() {
            tracing::debug!("Session not yet started, dropping {} sample", track);
            return FinishAction::None;
        }
        if inner.finish_state != FinishState::Active {
            tracing::debug!("Session is finishing, dropping {} sample", track);
            return FinishAction::None;
        }
        let status = self.shared.container.status();
        if status != WriterStatus::Writing {
            tracing::error!("Frame arrived, but container writer status is {}!", status.descriptor());
            return FinishAction::None;
        }
        if !sample.is_data_ready() {
            tracing::error!("Frame arrived, but sample buffer is not ready!");
            return FinishAction::None;
        }
        if sample.track != track {
            tracing::warn!("Sample for {} track was appended as {}, dropping it", sample.track, track);
            return FinishAction::None;
        }
        let Some(writer) = inner.writer(track) else {
            tracing::warn!("{} sample arrived, but no {} writer was initialized", track, track);
            return FinishAction::None;
        };

        // 2. Check the timestamp against the session window
        let timestamp = sample.presentation_timestamp();
        let admission =
            inner
                .timestamps
                .admit(track, timestamp, inner.audio_writer.is_some());
        match admission {
            Admission::Drop(DropReason::NotStarted) => return FinishAction::None,
            Admission::Drop(DropReason::BeforeInit { delay }) => {
                tracing::debug!(
                    "Capture pipeline has a delay of {} seconds. Skipping this late {} frame...",
                    delay.seconds(),
                    track
                );
                return FinishAction::None;
            }
            Admission::Drop(DropReason::AfterLastFrame) => {
                tracing::debug!("Already wrote the last {} frame, dropping {}", track, timestamp);
                return FinishAction::None;
            }
            Admission::CatchUp => {
                tracing::debug!("{} track is behind at {}, writing late frame", track, timestamp);
            }
            Admission::WriteFinal => {
                tracing::debug!("Writing ONE MORE {} frame at {}", track, timestamp);
            }
            Admission::Write => {}
        }

        // 3. Write, or queue audio that arrived before the session start
        match track {
            TrackType::Video => {
                if !writer.is_ready_for_more_media_data() {
                    tracing::warn!("Video writer is not ready for more data, dropping frame at {}", timestamp);
                    return FinishAction::None;
                }
                if admission == Admission::WriteFinal {
                    inner.timestamps.mark_track_complete(TrackType::Video);
                }
                if inner.timestamps.begin_session(timestamp) {
                    let delay = timestamp - inner.timestamps.init().unwrap_or(timestamp);
                    tracing::info!(
                        "Writing first video frame at {} ({} seconds after initializing)...",
                        timestamp,
                        delay.seconds()
                    );
                    self.shared.container.start_session(timestamp);
                }

                tracing::trace!("Writing VIDEO buffer at {}...", timestamp);
                if writer.append(&sample) {
                    inner.timestamps.record_written(TrackType::Video, timestamp);
                }
            }
            TrackType::Audio => {
                let Some(start) = inner.timestamps.start() else {
                    tracing::debug!("Queueing early audio buffer ({})", timestamp);
                    if admission == Admission::WriteFinal {
                        inner.timestamps.mark_track_complete(TrackType::Audio);
                    }
                    if inner.audio_queue.enqueue(sample) {
                        tracing::warn!(
                            "{} audio buffers queued and no video frame written yet, still waiting...",
                            inner.audio_queue.len()
                        );
                    }
                    return FinishAction::None;
                };
                if timestamp < start {
                    tracing::debug!("Dropping early audio buffer ({})", timestamp);
                    return FinishAction::None;
                }
                if !writer.is_ready_for_more_media_data() {
                    tracing::warn!("Audio writer is not ready for more data, dropping buffer at {}", timestamp);
                    return FinishAction::None;
                }
                if admission == Admission::WriteFinal {
                    inner.timestamps.mark_track_complete(TrackType::Audio);
                }

                if !inner.audio_queue.is_empty() {
                    tracing::info!("Writing {} queued audio buffers...", inner.audio_queue.len());
                    let outcome = inner.audio_queue.flush(start, &*writer);
                    if let Some(last) = outcome.last_written {
                        inner.timestamps.record_written(TrackType::Audio, last);
                    }
                    tracing::debug!(
                        "Audio queue flushed: {} written, {} dropped, {} remaining",
                        outcome.written,
                        outcome.dropped,
                        outcome.remaining
                    );
                }

                tracing::trace!("Writing AUDIO buffer at {}...", timestamp);
                if writer.append(&sample) {
                    inner.timestamps.record_written(TrackType::Audio, timestamp);
                }
            }
        }

        // 4. A failed write ends the recording
        if self.shared.container.status() == WriterStatus::Failed {
            tracing::error!(
                "Container writer failed to write buffer! Error: {}",
                self.shared
                    .container
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            return self.begin_finish(inner, FinishReason::WriteFailure);
        }

        // 5. Both tracks wrote their last frame
        if inner.timestamps.both_tracks_complete() {
            tracing::info!(
                "Successfully appended last {} buffer (at {}), finishing recording session...",
                track,
                timestamp
            );
            return self.begin_finish(inner, FinishReason::Completed);
        }

        FinishAction::None
    }

    /// Stop the writers and report through the completion handler
    fn finish(&self, reason: FinishReason) {
        let action = {
            let mut inner = self.shared.inner.lock();
            self.begin_finish(&mut inner, reason)
        };
        self.run_finish(action);
    }

    fn begin_finish(&self, inner: &mut SessionInner, reason: FinishReason) -> FinishAction {
        let status = self.shared.container.status();
        tracing::info!("Stopping container writer with status \"{}\"...", status.descriptor());

        if inner.finish_state != FinishState::Active {
            tracing::warn!("Tried calling finish() twice while the container writer is still writing!");
            return FinishAction::None;
        }

        if let Some(timeout) = inner.stop_timeout.take() {
            timeout.abort();
        }
        inner.finish_reason = Some(reason);

        let Some(handler) = inner.completion.take() else {
            inner.finish_state = FinishState::Finished;
            return FinishAction::None;
        };

        if status != WriterStatus::Writing {
            inner.finish_state = FinishState::Finished;
            return FinishAction::Report(handler);
        }

        inner.finish_state = FinishState::Finishing;
        if let Some(writer) = &inner.video_writer {
            writer.mark_as_finished();
        }
        if let Some(writer) = &inner.audio_writer {
            writer.mark_as_finished();
        }
        FinishAction::Finalize(handler)
    }

    fn run_finish(&self, action: FinishAction) {
        match action {
            FinishAction::None => {}
            FinishAction::Report(handler) => {
                let container = &self.shared.container;
                handler(self, container.status(), container.error().map(RecorderError::from));
            }
            FinishAction::Finalize(handler) => {
                let session = self.clone();
                self.shared.runtime.spawn(async move {
                    let container = session.shared.container.clone();
                    container.finish_writing().await;

                    let status = container.status();
                    let error = container.error().map(RecorderError::from);
                    session.shared.inner.lock().finish_state = FinishState::Finished;

                    tracing::info!(
                        "Recording session {} finished with status \"{}\" ({:.2} seconds)",
                        session.shared.id,
                        status.descriptor(),
                        session.elapsed_duration()
                    );
                    handler(&session, status, error);
                });
            }
        }
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.shared.id)
            .field("phase", &self.phase())
            .finish()
    }
}
