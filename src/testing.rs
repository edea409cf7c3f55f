//! Test doubles for the writer and clock seams

use crate::capture::{EncodedSample, MediaTime, SyncClock, TrackType};
use crate::recorder::RecordingSession;
use crate::utils::RecorderError;
use crate::writer::{ContainerWriter, TrackSettings, TrackWriter, WriterError, WriterStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn sample(track: TrackType, millis: i64) -> EncodedSample {
    EncodedSample::new(track, MediaTime::from_millis(millis), vec![0u8; 16])
}

#[derive(Debug)]
struct MockState {
    status: WriterStatus,
    error: Option<WriterError>,
    session_start: Option<MediaTime>,
    fail_appends: bool,
}

impl MockState {
    fn new(status: WriterStatus) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            status,
            error: None,
            session_start: None,
            fail_appends: false,
        }))
    }
}

/// Track writer that records the timestamps it was given
pub struct MockTrack {
    track: TrackType,
    state: Arc<Mutex<MockState>>,
    ready: AtomicBool,
    finished: AtomicBool,
    appended: Mutex<Vec<MediaTime>>,
}

impl MockTrack {
    fn attached(track: TrackType, state: Arc<Mutex<MockState>>) -> Self {
        Self {
            track,
            state,
            ready: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// A track writer that is not part of any container
    pub fn detached(track: TrackType) -> Self {
        Self::attached(track, MockState::new(WriterStatus::Writing))
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn timestamps(&self) -> Vec<MediaTime> {
        self.appended.lock().clone()
    }

    pub fn last_timestamp(&self) -> Option<MediaTime> {
        self.appended.lock().last().copied()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl TrackWriter for MockTrack {
    fn track(&self) -> TrackType {
        self.track
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn append(&self, sample: &EncodedSample) -> bool {
        let mut state = self.state.lock();
        if state.fail_appends {
            state.status = WriterStatus::Failed;
            state.error = Some(WriterError::Encoder("append rejected".into()));
            return false;
        }
        self.appended.lock().push(sample.pts);
        true
    }

    fn mark_as_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Container writer that only checks its destination directory exists
pub struct MockContainer {
    destination: PathBuf,
    state: Arc<Mutex<MockState>>,
    tracks: Mutex<Vec<Arc<MockTrack>>>,
    finish_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl MockContainer {
    pub fn new(destination: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            destination,
            state: MockState::new(WriterStatus::Unknown),
            tracks: Mutex::new(Vec::new()),
            finish_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        })
    }

    pub fn track(&self, track: TrackType) -> Arc<MockTrack> {
        self.tracks
            .lock()
            .iter()
            .find(|writer| writer.track == track)
            .cloned()
            .expect("track was not added")
    }

    pub fn fail_appends(&self) {
        self.state.lock().fail_appends = true;
    }

    pub fn session_start(&self) -> Option<MediaTime> {
        self.state.lock().session_start
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerWriter for MockContainer {
    fn output_location(&self) -> PathBuf {
        self.destination.clone()
    }

    fn add_track(
        &self,
        track: TrackType,
        _settings: &TrackSettings,
    ) -> Result<Arc<dyn TrackWriter>, WriterError> {
        let writer = Arc::new(MockTrack::attached(track, self.state.clone()));
        self.tracks.lock().push(writer.clone());
        Ok(writer)
    }

    fn start_writing(&self) -> Result<(), WriterError> {
        let parent_exists = self.destination.parent().is_some_and(|dir| dir.is_dir());
        if !parent_exists {
            return Err(WriterError::Destination(self.destination.display().to_string()));
        }
        self.state.lock().status = WriterStatus::Writing;
        Ok(())
    }

    fn start_session(&self, at: MediaTime) {
        self.state.lock().session_start = Some(at);
    }

    fn status(&self) -> WriterStatus {
        self.state.lock().status
    }

    fn error(&self) -> Option<WriterError> {
        self.state.lock().error.clone()
    }

    async fn finish_writing(&self) {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let mut state = self.state.lock();
        if state.status == WriterStatus::Writing {
            state.status = WriterStatus::Completed;
        }
    }

    fn cancel_writing(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().status = WriterStatus::Cancelled;
    }
}

/// Clock whose time is set by the test
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Self {
        let clock = Self::default();
        clock.set_millis(millis);
        clock
    }

    pub fn set_millis(&self, millis: i64) {
        self.now
            .store(MediaTime::from_millis(millis).as_nanos(), Ordering::SeqCst);
    }
}

impl SyncClock for ManualClock {
    fn now(&self) -> MediaTime {
        MediaTime::from_nanos(self.now.load(Ordering::SeqCst))
    }
}

/// What a completion callback reported
#[derive(Debug)]
pub struct Completion {
    pub status: WriterStatus,
    pub error: Option<String>,
    pub elapsed_secs: f64,
}

pub fn completion_channel() -> (
    impl FnOnce(&RecordingSession, WriterStatus, Option<RecorderError>) + Send + 'static,
    mpsc::UnboundedReceiver<Completion>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |session: &RecordingSession, status: WriterStatus, error: Option<RecorderError>| {
        let _ = tx.send(Completion {
            status,
            error: error.map(|e| e.to_string()),
            elapsed_secs: session.elapsed_duration(),
        });
    };
    (handler, rx)
}
