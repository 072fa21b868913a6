//! Coalescing watcher that publishes changes in periodic batches.
//!
//! Raw notifications are classified as they arrive and stored in a
//! path-keyed buffer, so several notifications for one path before the next
//! flush collapse into the latest classification. A timer flushes the buffer
//! every publish interval; empty buffers are never published.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::classifier::ChangeClassifier;
use super::error::WatchError;
use super::facility::{EventStream, RawEventFlags, RawNotification, StreamFlags, WatchFacility};
use crate::types::{FileEvent, FileEventKind};

/// Receives each published batch.
pub type BatchCallback = Arc<dyn Fn(Vec<FileEvent>) + Send + Sync>;

/// Decides whether a raw path is worth classifying at all.
pub type PathFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Options for a [`BatchingChangeWatcher`].
#[derive(Debug, Clone, Copy)]
pub struct BatchingOptions {
    pub publish_interval: Duration,
    pub latency: Duration,
}

impl Default for BatchingOptions {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_millis(500),
            latency: Duration::from_millis(100),
        }
    }
}

struct Inner {
    pending: Mutex<IndexMap<PathBuf, FileEventKind>>,
    classifier: Mutex<ChangeClassifier>,
    /// Serializes flushes so batches reach the callback in flush order.
    flush_lock: Mutex<()>,
    /// Thread currently inside the callback, if any.
    flushing: Mutex<Option<ThreadId>>,
    callback: BatchCallback,
    accept: Option<PathFilter>,
    disposed: AtomicBool,
}

impl Inner {
    fn record(&self, path: PathBuf, kind: FileEventKind) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        self.pending.lock().insert(path, kind);
    }

    fn classify(&self, notifications: Vec<RawNotification>, facility: &dyn WatchFacility) {
        for raw in notifications {
            if self.accept.as_ref().is_some_and(|accept| !accept(&raw.path)) {
                continue;
            }
            if raw.flags.contains(RawEventFlags::MUST_SCAN_SUBDIRS) {
                crate::debug_event!("watcher", "rescan requested", "{}", raw.path.display());
            }
            let exists = facility.path_exists(&raw.path);
            let kind = self.classifier.lock().classify(&raw, exists);
            if let Some(kind) = kind {
                self.record(raw.path, kind);
            }
        }
    }

    fn flush(&self) {
        let _order = self.flush_lock.lock();
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let batch: Vec<FileEvent> = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return;
            }
            let batch = pending
                .drain(..)
                .filter_map(|(path, kind)| FileEvent::for_path(&path, kind))
                .collect();
            self.classifier.lock().forget_deleted();
            batch
        };

        if batch.is_empty() || self.disposed.load(Ordering::Acquire) {
            return;
        }

        crate::debug_event!("watcher", "publishing", "{} events", batch.len());
        *self.flushing.lock() = Some(thread::current().id());
        (self.callback)(batch);
        *self.flushing.lock() = None;
    }

    fn is_flushing_thread(&self) -> bool {
        *self.flushing.lock() == Some(thread::current().id())
    }
}

/// Watches a fixed set of roots and publishes coalesced batches.
///
/// The root set is fixed at construction. Disposing (or dropping) the
/// watcher stops the native stream and the timer; no callback fires after
/// disposal returns, apart from a flush already past its disposal check.
pub struct BatchingChangeWatcher {
    roots: Vec<PathBuf>,
    inner: Arc<Inner>,
    stream: Mutex<Option<Box<dyn EventStream>>>,
    /// Kept alive for existence probes; the stream callback only holds a weak handle.
    _facility: Arc<dyn WatchFacility>,
    cancel: CancellationToken,
}

impl BatchingChangeWatcher {
    /// Register one event stream over `roots`, start it and start the publish timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        roots: Vec<PathBuf>,
        callback: BatchCallback,
        options: BatchingOptions,
        facility: Arc<dyn WatchFacility>,
    ) -> Result<Self, WatchError> {
        Self::with_filter(roots, callback, options, facility, None)
    }

    /// Like [`new`](Self::new), but raw notifications for paths rejected by
    /// `accept` are dropped before classification and never remembered.
    pub fn with_filter(
        roots: Vec<PathBuf>,
        callback: BatchCallback,
        options: BatchingOptions,
        facility: Arc<dyn WatchFacility>,
        accept: Option<PathFilter>,
    ) -> Result<Self, WatchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        let inner = Arc::new(Inner {
            pending: Mutex::new(IndexMap::new()),
            classifier: Mutex::new(ChangeClassifier::new()),
            flush_lock: Mutex::new(()),
            flushing: Mutex::new(None),
            callback,
            accept,
            disposed: AtomicBool::new(false),
        });

        let raw_inner = Arc::downgrade(&inner);
        let raw_facility: Weak<dyn WatchFacility> = Arc::downgrade(&facility);
        let on_raw = Box::new(move |notifications: Vec<RawNotification>| {
            if let (Some(inner), Some(facility)) = (raw_inner.upgrade(), raw_facility.upgrade()) {
                inner.classify(notifications, facility.as_ref());
            }
        });

        let mut stream = facility
            .create_event_stream(
                &roots,
                options.latency,
                StreamFlags::FILE_EVENTS | StreamFlags::NO_DEFER | StreamFlags::WATCH_ROOT,
                on_raw,
            )
            .ok_or_else(|| WatchError::StreamCreationFailed {
                paths: roots.clone(),
            })?;

        if !stream.start() {
            stream.invalidate();
            return Err(WatchError::StreamStartFailed);
        }

        let cancel = CancellationToken::new();
        let timer_inner = Arc::downgrade(&inner);
        let timer_cancel = cancel.clone();
        let interval = options.publish_interval.max(Duration::from_millis(1));
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = timer_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = timer_inner.upgrade() else {
                            break;
                        };
                        inner.flush();
                    }
                }
            }
        });

        crate::log_event!("watcher", "started", "{} roots", roots.len());

        Ok(Self {
            roots,
            inner,
            stream: Mutex::new(Some(stream)),
            _facility: facility,
            cancel,
        })
    }

    /// Roots this watcher observes. Never changes.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn on_file_created(&self, path: impl Into<PathBuf>) {
        self.inner.record(path.into(), FileEventKind::Created);
    }

    pub fn on_file_changed(&self, path: impl Into<PathBuf>) {
        self.inner.record(path.into(), FileEventKind::Changed);
    }

    pub fn on_file_deleted(&self, path: impl Into<PathBuf>) {
        self.inner.record(path.into(), FileEventKind::Deleted);
    }

    /// Number of paths waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Number of paths the classifier currently remembers.
    pub fn tracked_paths(&self) -> usize {
        self.inner.classifier.lock().tracked()
    }

    /// Publish pending changes now instead of waiting for the timer.
    pub fn flush_now(&self) {
        self.inner.flush();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Stop the stream and timer and drop pending changes. Idempotent.
    ///
    /// Waits for an in-progress flush on another thread. Called from the batch
    /// callback itself (directly or by dropping the watcher), it returns
    /// without waiting and the current batch is the last one delivered.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.cancel.cancel();
        if let Some(mut stream) = self.stream.lock().take() {
            stream.stop();
            stream.invalidate();
        }
        // Wait out a flush that is mid-callback, unless that flush is us.
        if !self.inner.is_flushing_thread() {
            drop(self.inner.flush_lock.lock());
        }
        self.inner.pending.lock().clear();

        crate::debug_event!("watcher", "disposed", "{} roots", self.roots.len());
    }
}

impl Drop for BatchingChangeWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}
