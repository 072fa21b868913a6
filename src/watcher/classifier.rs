//! Turns raw OS notifications into created/changed/deleted.
//!
//! The OS reports *that* something happened to a path, often with merged
//! or misleading flags. The classifier decides *what* happened by comparing
//! the path's current existence with what it last saw for that path.

use std::collections::HashMap;
use std::path::PathBuf;

use super::facility::{RawEventFlags, RawNotification};
use crate::types::FileEventKind;

#[derive(Debug, Default)]
pub struct ChangeClassifier {
    /// Last observed existence per path.
    known: HashMap<PathBuf, bool>,
}

impl ChangeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one notification given whether the path exists right now.
    ///
    /// Returns `None` for directories and for repeated removals of a path
    /// already reported deleted since the last [`forget_deleted`](Self::forget_deleted).
    pub fn classify(&mut self, raw: &RawNotification, exists: bool) -> Option<FileEventKind> {
        if raw.flags.contains(RawEventFlags::IS_DIR) {
            return None;
        }

        let prior = self.known.insert(raw.path.clone(), exists);

        if exists {
            let kind = match prior {
                Some(true) => FileEventKind::Changed,
                Some(false) => FileEventKind::Created,
                None if raw
                    .flags
                    .intersects(RawEventFlags::ITEM_CREATED | RawEventFlags::ITEM_RENAMED) =>
                {
                    FileEventKind::Created
                }
                None => FileEventKind::Changed,
            };
            Some(kind)
        } else if prior == Some(false) {
            None
        } else {
            Some(FileEventKind::Deleted)
        }
    }

    /// Drop paths whose last sighting was a removal.
    ///
    /// Called after each flush; a later removal of a forgotten path reports
    /// `Deleted` again, which the index treats as a no-op.
    pub fn forget_deleted(&mut self) {
        self.known.retain(|_, exists| *exists);
    }

    /// Number of paths with a remembered existence state.
    pub fn tracked(&self) -> usize {
        self.known.len()
    }
}
