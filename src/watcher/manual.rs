//! Deterministic [`WatchFacility`] for tests.
//!
//! No OS interaction: tests push raw notifications with
//! [`ManualFacility::emit`], control which paths "exist", and can make
//! stream creation or start fail. The facility also records how many streams were
//! created and over which roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::facility::{
    EventStream, RawEventCallback, RawEventFlags, RawNotification, StreamFlags, WatchFacility,
};

#[derive(Default)]
struct Shared {
    streams: Mutex<Vec<StreamRecord>>,
    existing: Mutex<HashSet<PathBuf>>,
    refuse_streams: AtomicBool,
    refuse_start: AtomicBool,
}

struct StreamRecord {
    paths: Vec<PathBuf>,
    callback: Arc<RawEventCallback>,
    state: Arc<Mutex<StreamState>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Created,
    Started,
    Stopped,
    Invalidated,
}

/// Cloneable handle; every clone observes the same streams.
#[derive(Clone, Default)]
pub struct ManualFacility {
    shared: Arc<Shared>,
}

impl ManualFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_event_stream` calls return `None`.
    pub fn refuse_streams(&self, refuse: bool) {
        self.shared.refuse_streams.store(refuse, Ordering::SeqCst);
    }

    /// Make `start` fail on streams created from now on.
    pub fn refuse_start(&self, refuse: bool) {
        self.shared.refuse_start.store(refuse, Ordering::SeqCst);
    }

    /// Number of streams created so far.
    pub fn streams_created(&self) -> usize {
        self.shared.streams.lock().len()
    }

    /// Roots of the `n`th stream created.
    pub fn stream_paths(&self, n: usize) -> Option<Vec<PathBuf>> {
        self.shared.streams.lock().get(n).map(|s| s.paths.clone())
    }

    /// Lifecycle state of the `n`th stream created.
    pub fn stream_state(&self, n: usize) -> Option<StreamState> {
        self.shared.streams.lock().get(n).map(|s| *s.state.lock())
    }

    /// Mark `path` as existing (or not) for classification.
    pub fn set_exists(&self, path: impl Into<PathBuf>, exists: bool) {
        let path = path.into();
        let mut existing = self.shared.existing.lock();
        if exists {
            existing.insert(path);
        } else {
            existing.remove(&path);
        }
    }

    /// Deliver notifications to every started stream covering the paths.
    pub fn emit(&self, notifications: Vec<RawNotification>) {
        let targets: Vec<_> = self
            .shared
            .streams
            .lock()
            .iter()
            .filter(|s| *s.state.lock() == StreamState::Started)
            .map(|s| (s.paths.clone(), s.callback.clone()))
            .collect();

        for (paths, callback) in targets {
            let covered: Vec<_> = notifications
                .iter()
                .filter(|n| paths.iter().any(|root| n.path.starts_with(root)))
                .cloned()
                .collect();
            if !covered.is_empty() {
                callback(covered);
            }
        }
    }

    /// Convenience: the file now exists and the OS reported a creation.
    pub fn emit_created(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.set_exists(path.clone(), true);
        self.emit(vec![RawNotification::new(
            path,
            RawEventFlags::ITEM_CREATED | RawEventFlags::IS_FILE,
        )]);
    }

    /// Convenience: the file exists and the OS reported a modification.
    pub fn emit_modified(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.set_exists(path.clone(), true);
        self.emit(vec![RawNotification::new(
            path,
            RawEventFlags::ITEM_MODIFIED | RawEventFlags::IS_FILE,
        )]);
    }

    /// Convenience: the file is gone and the OS reported a removal.
    pub fn emit_removed(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.set_exists(path.clone(), false);
        self.emit(vec![RawNotification::new(
            path,
            RawEventFlags::ITEM_REMOVED | RawEventFlags::IS_FILE,
        )]);
    }
}

impl WatchFacility for ManualFacility {
    fn create_event_stream(
        &self,
        paths: &[PathBuf],
        _latency: Duration,
        _flags: StreamFlags,
        callback: RawEventCallback,
    ) -> Option<Box<dyn EventStream>> {
        if self.shared.refuse_streams.load(Ordering::SeqCst) {
            return None;
        }

        let state = Arc::new(Mutex::new(StreamState::Created));
        self.shared.streams.lock().push(StreamRecord {
            paths: paths.to_vec(),
            callback: Arc::new(callback),
            state: state.clone(),
        });

        Some(Box::new(ManualStream {
            state,
            refuse_start: self.shared.refuse_start.load(Ordering::SeqCst),
        }))
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.shared.existing.lock().contains(path)
    }
}

struct ManualStream {
    state: Arc<Mutex<StreamState>>,
    refuse_start: bool,
}

impl EventStream for ManualStream {
    fn start(&mut self) -> bool {
        let mut state = self.state.lock();
        if self.refuse_start || *state == StreamState::Invalidated {
            return false;
        }
        *state = StreamState::Started;
        true
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        if *state != StreamState::Invalidated {
            *state = StreamState::Stopped;
        }
    }

    fn invalidate(&mut self) {
        *self.state.lock() = StreamState::Invalidated;
    }
}

impl Drop for ManualStream {
    fn drop(&mut self) {
        *self.state.lock() = StreamState::Invalidated;
    }
}
