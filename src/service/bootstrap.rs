//! Initial file hand-off to a downstream index.
//!
//! On the first non-empty resolution of a workspace the consumer receives
//! a bounded prefix of the discovered files inline, and the rest as
//! `created` batches paced with a small delay between them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::WatchConfig;
use crate::types::{FileEvent, FileEventKind, FileReference};

/// How the initial file list is split between inline and paced delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapPlan {
    pub inline: Vec<Url>,
    pub chunks: Vec<Vec<FileEvent>>,
}

impl BootstrapPlan {
    /// Split `files` using the bootstrap limits of `config`.
    ///
    /// Only the first `bootstrap_max_files` files are considered at all.
    pub fn new(files: &[FileReference], config: &WatchConfig) -> Self {
        let mut uris = files
            .iter()
            .take(config.bootstrap_max_files)
            .filter_map(FileReference::uri);

        let inline: Vec<Url> = uris.by_ref().take(config.bootstrap_inline_limit).collect();

        let chunk_size = config.bootstrap_chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut current = Vec::with_capacity(chunk_size);
        for uri in uris {
            current.push(FileEvent::new(uri, FileEventKind::Created));
            if current.len() == chunk_size {
                chunks.push(std::mem::replace(&mut current, Vec::with_capacity(chunk_size)));
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }

        Self { inline, chunks }
    }

    /// Total number of files the plan delivers.
    pub fn len(&self) -> usize {
        self.inline.len() + self.chunks.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deliver `chunks` to `sink`, waiting `delay` between consecutive chunks.
///
/// Stops early when `cancel` fires; the chunk in progress is not resent.
pub async fn deliver_chunks<F>(
    chunks: Vec<Vec<FileEvent>>,
    delay: Duration,
    cancel: CancellationToken,
    sink: F,
) where
    F: Fn(Vec<FileEvent>),
{
    let total = chunks.len();
    for (n, chunk) in chunks.into_iter().enumerate() {
        if n > 0 {
            tokio::select! {
                _ = cancel.cancelled() => {
                    crate::debug_event!("bootstrap", "cancelled", "{n}/{total} chunks sent");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return;
        }
        sink(chunk);
    }
    crate::debug_event!("bootstrap", "complete", "{total} chunks");
}
