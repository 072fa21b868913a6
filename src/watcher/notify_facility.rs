//! [`WatchFacility`] backed by `notify::RecommendedWatcher`.

use std::path::PathBuf;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::facility::{
    EventStream, RawEventCallback, RawEventFlags, RawNotification, StreamFlags, WatchFacility,
};

/// Native facility using the platform's recommended notify backend
/// (FSEvents, inotify, ReadDirectoryChangesW, ...).
///
/// `recommended_watcher` exposes no per-stream latency or FSEvents flags, so
/// both hints are only logged. Notify always reports individual files and
/// changes to the watched roots, which covers `FILE_EVENTS` and `WATCH_ROOT`;
/// events are delivered as soon as notify sees them, which covers `NO_DEFER`.
/// Coalescing happens in the batching watcher's publish interval instead.
#[derive(Debug, Default, Clone)]
pub struct NotifyFacility;

impl NotifyFacility {
    pub fn new() -> Self {
        Self
    }
}

impl WatchFacility for NotifyFacility {
    fn create_event_stream(
        &self,
        paths: &[PathBuf],
        latency: Duration,
        flags: StreamFlags,
        callback: RawEventCallback,
    ) -> Option<Box<dyn EventStream>> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let notifications = to_raw_notifications(&event);
                if !notifications.is_empty() {
                    callback(notifications);
                }
            }
            Err(e) => {
                crate::warn_event!("watcher", "event stream error", "{e}");
            }
        });

        match watcher {
            Ok(watcher) => {
                crate::debug_event!(
                    "watcher",
                    "stream created",
                    "{} roots, latency {latency:?}, flags {flags:?}",
                    paths.len()
                );
                Some(Box::new(NotifyEventStream {
                    watcher: Some(watcher),
                    paths: paths.to_vec(),
                    watching: Vec::new(),
                }))
            }
            Err(e) => {
                crate::warn_event!("watcher", "stream creation refused", "{e}");
                None
            }
        }
    }
}

struct NotifyEventStream {
    watcher: Option<notify::RecommendedWatcher>,
    paths: Vec<PathBuf>,
    watching: Vec<PathBuf>,
}

impl EventStream for NotifyEventStream {
    fn start(&mut self) -> bool {
        let Some(watcher) = self.watcher.as_mut() else {
            return false;
        };

        for path in &self.paths {
            if self.watching.contains(path) {
                continue;
            }
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => self.watching.push(path.clone()),
                Err(e) => {
                    crate::warn_event!("watcher", "cannot watch", "{}: {e}", path.display());
                }
            }
        }

        // A stream over zero live roots still "starts"; there is simply nothing to report.
        self.paths.is_empty() || !self.watching.is_empty()
    }

    fn stop(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            for path in self.watching.drain(..) {
                if let Err(e) = watcher.unwatch(&path) {
                    crate::debug_event!("watcher", "unwatch failed", "{}: {e}", path.display());
                }
            }
        }
    }

    fn invalidate(&mut self) {
        self.watching.clear();
        self.watcher = None;
    }
}

/// Translate one notify event into per-path raw notifications.
fn to_raw_notifications(event: &Event) -> Vec<RawNotification> {
    let mut flags = match event.kind {
        EventKind::Create(kind) => {
            RawEventFlags::ITEM_CREATED
                | match kind {
                    CreateKind::File => RawEventFlags::IS_FILE,
                    CreateKind::Folder => RawEventFlags::IS_DIR,
                    _ => RawEventFlags::empty(),
                }
        }
        EventKind::Remove(kind) => {
            RawEventFlags::ITEM_REMOVED
                | match kind {
                    RemoveKind::File => RawEventFlags::IS_FILE,
                    RemoveKind::Folder => RawEventFlags::IS_DIR,
                    _ => RawEventFlags::empty(),
                }
        }
        EventKind::Modify(ModifyKind::Name(_)) => RawEventFlags::ITEM_RENAMED,
        EventKind::Modify(_) => RawEventFlags::ITEM_MODIFIED,
        EventKind::Any | EventKind::Other => RawEventFlags::empty(),
        EventKind::Access(_) => return Vec::new(),
    };

    if event.need_rescan() {
        flags |= RawEventFlags::MUST_SCAN_SUBDIRS;
    }

    event
        .paths
        .iter()
        .map(|path| RawNotification::new(path.clone(), flags))
        .collect()
}
