//! The OS file-change notification seam.
//!
//! [`WatchFacility`] is the only way the watcher reaches the operating
//! system. Production code uses the notify-backed
//! [`NotifyFacility`](super::NotifyFacility); tests inject a
//! [`ManualFacility`](super::ManualFacility).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// Options for a new event stream.
    ///
    /// Hints: a facility applies the ones its backend supports and ignores the rest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamFlags: u32 {
        /// Report individual files, not just the directories that changed.
        const FILE_EVENTS = 1 << 0;
        /// Deliver the first event of a burst without waiting for latency.
        const NO_DEFER = 1 << 1;
        /// Report changes to the watched roots themselves.
        const WATCH_ROOT = 1 << 2;
    }
}

bitflags! {
    /// What the OS says happened to one path.
    ///
    /// Several flags may be set at once when the OS merged notifications.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RawEventFlags: u32 {
        const ITEM_CREATED = 1 << 0;
        const ITEM_REMOVED = 1 << 1;
        const ITEM_MODIFIED = 1 << 2;
        const ITEM_RENAMED = 1 << 3;
        const IS_FILE = 1 << 4;
        const IS_DIR = 1 << 5;
        /// Events were dropped; the subtree should be rescanned.
        const MUST_SCAN_SUBDIRS = 1 << 6;
    }
}

/// A single unclassified notification from the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub path: PathBuf,
    pub flags: RawEventFlags,
}

impl RawNotification {
    pub fn new(path: impl Into<PathBuf>, flags: RawEventFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }
}

/// Receives notifications on whatever thread the facility delivers them.
pub type RawEventCallback = Box<dyn Fn(Vec<RawNotification>) + Send + Sync>;

/// Creates native event streams.
pub trait WatchFacility: Send + Sync {
    /// Create a stream covering `paths`. Returns `None` when the OS refuses.
    ///
    /// The stream does not deliver anything until [`EventStream::start`].
    /// `latency` and `flags` are hints, see [`StreamFlags`].
    fn create_event_stream(
        &self,
        paths: &[PathBuf],
        latency: Duration,
        flags: StreamFlags,
        callback: RawEventCallback,
    ) -> Option<Box<dyn EventStream>>;

    /// Whether `path` currently exists. Used to classify notifications.
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// A live native stream. Dropping the stream releases it.
pub trait EventStream: Send {
    /// Begin delivering events. Returns `false` if the OS refused.
    fn start(&mut self) -> bool;

    /// Stop delivering events; the stream may be started again.
    fn stop(&mut self);

    /// Tear down OS resources. A stopped, invalidated stream is inert.
    fn invalidate(&mut self);
}
