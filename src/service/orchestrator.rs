//! Per-workspace owner of enumeration, the live watcher and reconciliation.
//!
//! ```text
//! start_watching()
//!   resolve -> enumerate -> index.set_files -> bootstrap
//!   BatchingChangeWatcher(initial roots)   live batches -> index -> listener
//!   reconcile loop (own interval)          root diff -> synthetic batches -> listener
//! ```
//!
//! The live watcher is bound to the roots known when watching started and
//! is never rebound. Roots discovered later are only covered by periodic
//! reconciliation until watching is restarted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::bootstrap::{BootstrapPlan, deliver_chunks};
use super::provider::TopologyProvider;
use crate::config::WatchConfig;
use crate::indexing::WorkspaceFileIndex;
use crate::types::{FileEvent, FileEventKind, FileReference, ProjectRoot, WorkspaceIdentity};
use crate::watcher::{BatchingChangeWatcher, BatchingOptions, PathFilter, WatchFacility};

/// Receives everything an orchestrator publishes for its workspace.
pub trait WatchListener: Send + Sync {
    /// Inline prefix of the first non-empty enumeration. Called at most once.
    fn on_bootstrap(&self, _workspace: &WorkspaceIdentity, _files: Vec<Url>) {}

    /// A non-empty batch of live, synthetic or paced bootstrap events.
    fn on_batch(&self, workspace: &WorkspaceIdentity, batch: Vec<FileEvent>);
}

/// Adapts a plain batch callback into a [`WatchListener`].
pub struct CallbackListener<F> {
    callback: F,
}

impl<F> CallbackListener<F>
where
    F: Fn(Vec<FileEvent>) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> WatchListener for CallbackListener<F>
where
    F: Fn(Vec<FileEvent>) + Send + Sync,
{
    fn on_batch(&self, _workspace: &WorkspaceIdentity, batch: Vec<FileEvent>) {
        (self.callback)(batch);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Watching,
}

/// Collaborators shared by every orchestrator of a registry.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub topology: Arc<dyn TopologyProvider>,
    pub facility: Arc<dyn WatchFacility>,
    pub index: Arc<WorkspaceFileIndex>,
    pub config: WatchConfig,
}

pub struct WorkspaceWatchOrchestrator {
    workspace: WorkspaceIdentity,
    context: OrchestratorContext,
    listener: Arc<dyn WatchListener>,
    state: Mutex<OrchestratorState>,
    /// Cancelled on stop; replaced on every start.
    session: Mutex<CancellationToken>,
    watcher: Mutex<Option<BatchingChangeWatcher>>,
    /// Known roots in resolution order, with the files last enumerated for each.
    known: Mutex<IndexMap<ProjectRoot, Vec<FileReference>>>,
    /// Serializes start and reconciliation so root diffs never interleave.
    reconcile_lock: tokio::sync::Mutex<()>,
    bootstrapped: AtomicBool,
    bootstrap_files: Mutex<Option<Vec<Url>>>,
}

impl WorkspaceWatchOrchestrator {
    pub fn new(
        workspace: WorkspaceIdentity,
        context: OrchestratorContext,
        listener: Arc<dyn WatchListener>,
    ) -> Self {
        Self {
            workspace,
            context,
            listener,
            state: Mutex::new(OrchestratorState::Idle),
            session: Mutex::new(CancellationToken::new()),
            watcher: Mutex::new(None),
            known: Mutex::new(IndexMap::new()),
            reconcile_lock: tokio::sync::Mutex::new(()),
            bootstrapped: AtomicBool::new(false),
            bootstrap_files: Mutex::new(None),
        }
    }

    pub fn workspace(&self) -> &WorkspaceIdentity {
        &self.workspace
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    pub fn is_watching(&self) -> bool {
        self.state() == OrchestratorState::Watching
    }

    /// Whether a live OS-backed watcher is running.
    pub fn has_live_watcher(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Roots the live watcher observes, empty when there is none.
    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.watcher
            .lock()
            .as_ref()
            .map(|w| w.roots().to_vec())
            .unwrap_or_default()
    }

    /// Project roots as of the last resolution.
    pub fn project_roots(&self) -> Vec<ProjectRoot> {
        self.known.lock().keys().cloned().collect()
    }

    /// Inline bootstrap URIs, once bootstrap has happened.
    pub fn bootstrap_files(&self) -> Option<Vec<Url>> {
        self.bootstrap_files.lock().clone()
    }

    /// Begin watching. No-op for the sentinel workspace or when already watching.
    ///
    /// Resolution and enumeration run on the blocking pool. If the OS
    /// refuses a live stream, watching continues on reconciliation alone.
    pub async fn start_watching(self: &Arc<Self>) {
        if self.workspace.is_sentinel() {
            crate::debug_event!("orchestrator", "sentinel workspace ignored");
            return;
        }

        let session = {
            let mut state = self.state.lock();
            if *state != OrchestratorState::Idle {
                return;
            }
            *state = OrchestratorState::Watching;

            let token = CancellationToken::new();
            *self.session.lock() = token.clone();
            token
        };

        let _serial = self.reconcile_lock.lock().await;

        let roots = self.resolve().await;
        let enumerated = self.enumerate(roots.clone()).await;
        if session.is_cancelled() {
            return;
        }

        let all: Vec<FileReference> = enumerated
            .iter()
            .flat_map(|(_, files)| files.iter().cloned())
            .collect();
        self.context.index.set_files(&self.workspace, all.iter().cloned());
        *self.known.lock() = enumerated.into_iter().collect();

        crate::log_event!(
            "orchestrator",
            "watching",
            "{} with {} project roots, {} files",
            self.workspace,
            roots.len(),
            all.len()
        );

        if !roots.is_empty() {
            self.bootstrap(&all, &session);
            self.start_live_watcher(&roots, &session);
        }

        self.spawn_reconcile_loop(session);
    }

    /// Stop timers and the live watcher. The index keeps its contents.
    pub fn stop_watching(&self) {
        {
            let mut state = self.state.lock();
            if *state == OrchestratorState::Idle {
                return;
            }
            *state = OrchestratorState::Idle;
        }

        self.session.lock().cancel();
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.dispose();
        }

        crate::log_event!("orchestrator", "stopped", "{}", self.workspace);
    }

    /// Re-resolve topology once and publish synthetic events for the root diff.
    ///
    /// Removed roots produce one `deleted` batch each and added roots one
    /// `created` batch each. Never creates or rebinds a live watcher.
    pub async fn reconcile_once(&self) {
        if !self.is_watching() {
            return;
        }
        let session = self.session.lock().clone();
        let _serial = self.reconcile_lock.lock().await;

        let fresh = self.resolve().await;
        if session.is_cancelled() {
            return;
        }

        let (added, removed): (Vec<ProjectRoot>, Vec<ProjectRoot>) = {
            let known = self.known.lock();
            (
                fresh.iter().filter(|r| !known.contains_key(*r)).cloned().collect(),
                known.keys().filter(|r| !fresh.contains(*r)).cloned().collect(),
            )
        };
        if added.is_empty() && removed.is_empty() {
            return;
        }

        crate::log_event!(
            "orchestrator",
            "topology changed",
            "{}: +{} -{} project roots",
            self.workspace,
            added.len(),
            removed.len()
        );

        let enumerated = self.enumerate(added).await;
        if session.is_cancelled() {
            return;
        }

        for root in &removed {
            let last = self.known.lock().shift_remove(root).unwrap_or_default();
            let files = self.evict_root(root, &fresh, last);
            self.publish(FileEventKind::Deleted, &files);
        }

        if self.bootstrapped.load(Ordering::Acquire) {
            for (_, files) in &enumerated {
                // A root nested in a known one re-lists files consumers already have.
                let new_files: Vec<FileReference> = files
                    .iter()
                    .filter(|f| !self.context.index.contains(&self.workspace, f))
                    .cloned()
                    .collect();
                for file in &new_files {
                    self.context.index.add_file(&self.workspace, file.clone());
                }
                self.publish(FileEventKind::Created, &new_files);
            }
        } else {
            // First non-empty resolution happened on a tick.
            let all: Vec<FileReference> = enumerated
                .iter()
                .flat_map(|(_, files)| files.iter().cloned())
                .collect();
            for file in &all {
                self.context.index.add_file(&self.workspace, file.clone());
            }
            self.bootstrap(&all, &session);
        }

        let mut additions: IndexMap<ProjectRoot, Vec<FileReference>> =
            enumerated.into_iter().collect();
        let mut known = self.known.lock();
        let mut previous = std::mem::take(&mut *known);
        *known = fresh
            .into_iter()
            .map(|root| {
                let files = previous
                    .shift_remove(&root)
                    .or_else(|| additions.shift_remove(&root))
                    .unwrap_or_default();
                (root, files)
            })
            .collect();
    }

    async fn resolve(&self) -> Vec<ProjectRoot> {
        let topology = self.context.topology.clone();
        let workspace = self.workspace.clone();
        match tokio::task::spawn_blocking(move || topology.project_roots(&workspace)).await {
            Ok(roots) => roots,
            Err(e) => {
                crate::warn_event!("orchestrator", "resolution task failed", "{e}");
                Vec::new()
            }
        }
    }

    async fn enumerate(&self, roots: Vec<ProjectRoot>) -> Vec<(ProjectRoot, Vec<FileReference>)> {
        if roots.is_empty() {
            return Vec::new();
        }
        let topology = self.context.topology.clone();
        let task = tokio::task::spawn_blocking(move || {
            roots
                .into_iter()
                .map(|root| {
                    let files = topology.enumerate_files(&root);
                    (root, files)
                })
                .collect::<Vec<_>>()
        });
        match task.await {
            Ok(enumerated) => enumerated,
            Err(e) => {
                crate::warn_event!("orchestrator", "enumeration task failed", "{e}");
                Vec::new()
            }
        }
    }

    /// Drop a removed root's files from the index and return them.
    ///
    /// Files that also sit under a root that is still present stay indexed.
    /// Falls back to the last enumeration when the index held none.
    fn evict_root(
        &self,
        root: &ProjectRoot,
        remaining: &[ProjectRoot],
        last_enumeration: Vec<FileReference>,
    ) -> Vec<FileReference> {
        let still_owned = |path: &Path| remaining.iter().any(|r| r.contains(path));

        let evicted = self
            .context
            .index
            .remove_under(&self.workspace, root.path(), &still_owned);
        if !evicted.is_empty() {
            return evicted;
        }

        last_enumeration
            .into_iter()
            .filter(|f| !still_owned(f.absolute_path()))
            .collect()
    }

    fn publish(&self, kind: FileEventKind, files: &[FileReference]) {
        let batch: Vec<FileEvent> = files
            .iter()
            .filter_map(|f| FileEvent::for_path(f.absolute_path(), kind))
            .collect();
        if batch.is_empty() {
            return;
        }
        crate::debug_event!("orchestrator", "synthetic batch", "{} {kind} events", batch.len());
        self.listener.on_batch(&self.workspace, batch);
    }

    fn bootstrap(&self, files: &[FileReference], session: &CancellationToken) {
        if self.bootstrapped.swap(true, Ordering::AcqRel) {
            return;
        }

        let plan = BootstrapPlan::new(files, &self.context.config);
        crate::log_event!(
            "orchestrator",
            "bootstrap",
            "{} inline, {} paced chunks",
            plan.inline.len(),
            plan.chunks.len()
        );

        *self.bootstrap_files.lock() = Some(plan.inline.clone());
        self.listener.on_bootstrap(&self.workspace, plan.inline);

        if plan.chunks.is_empty() {
            return;
        }
        let listener = self.listener.clone();
        let workspace = self.workspace.clone();
        let delay = self.context.config.bootstrap_chunk_delay;
        let cancel = session.clone();
        tokio::spawn(async move {
            deliver_chunks(plan.chunks, delay, cancel, |chunk| {
                listener.on_batch(&workspace, chunk)
            })
            .await;
        });
    }

    fn start_live_watcher(self: &Arc<Self>, roots: &[ProjectRoot], session: &CancellationToken) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let callback = Arc::new(move |batch: Vec<FileEvent>| {
            // The strong handle is gone before the listener runs, so a listener
            // that drops or unwatches this orchestrator never tears it down here.
            let delivery = weak.upgrade().and_then(|this| this.apply_live_batch(batch));
            if let Some((listener, workspace, accepted)) = delivery {
                listener.on_batch(&workspace, accepted);
            }
        });

        let accept: PathFilter = {
            let topology = self.context.topology.clone();
            let roots = roots.to_vec();
            Arc::new(move |path: &Path| {
                deepest_root(&roots, path).is_some_and(|root| topology.accepts(root, path))
            })
        };

        let options = BatchingOptions {
            publish_interval: self.context.config.publish_interval,
            latency: self.context.config.stream_latency,
        };
        let paths = roots.iter().map(|r| r.path().to_path_buf()).collect();

        match BatchingChangeWatcher::with_filter(
            paths,
            callback,
            options,
            self.context.facility.clone(),
            Some(accept),
        ) {
            Ok(watcher) => {
                // Checked under the slot lock so a concurrent stop cannot miss it.
                let mut slot = self.watcher.lock();
                if session.is_cancelled() {
                    watcher.dispose();
                } else {
                    *slot = Some(watcher);
                }
            }
            Err(e) => {
                crate::warn_event!(
                    "orchestrator",
                    "live watching unavailable",
                    "{}: {e}; relying on reconciliation",
                    self.workspace
                );
            }
        }
    }

    /// Filter a live batch to enumerable files and update the index.
    ///
    /// Returns what should be forwarded; the caller delivers it.
    fn apply_live_batch(
        &self,
        batch: Vec<FileEvent>,
    ) -> Option<(Arc<dyn WatchListener>, WorkspaceIdentity, Vec<FileEvent>)> {
        if !self.is_watching() {
            return None;
        }

        let known = self.project_roots();
        let mut accepted = Vec::with_capacity(batch.len());

        for event in batch {
            let Some(path) = event.path() else {
                continue;
            };
            let Some(root) = deepest_root(&known, &path) else {
                continue;
            };
            if !self.context.topology.accepts(root, &path) {
                continue;
            }

            let file = FileReference::new(root.path(), path.clone());
            match event.kind {
                FileEventKind::Created | FileEventKind::Changed => {
                    if !self.context.index.add_file(&self.workspace, file) {
                        crate::debug_event!("orchestrator", "index full", "{}", path.display());
                    }
                }
                FileEventKind::Deleted => self.context.index.remove_file(&self.workspace, &file),
            }
            accepted.push(event);
        }

        if accepted.is_empty() {
            return None;
        }
        Some((self.listener.clone(), self.workspace.clone(), accepted))
    }

    fn spawn_reconcile_loop(self: &Arc<Self>, session: CancellationToken) {
        let weak = Arc::downgrade(self);
        let period = self.context.config.reconcile_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = session.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(this) = weak.upgrade() else {
                            break;
                        };
                        this.reconcile_once().await;
                    }
                }
            }
        });
    }
}

/// Deepest root containing `path`; nested projects win over their parents.
fn deepest_root<'a>(roots: &'a [ProjectRoot], path: &Path) -> Option<&'a ProjectRoot> {
    roots
        .iter()
        .filter(|r| r.contains(path))
        .max_by_key(|r| r.path().components().count())
}

impl Drop for WorkspaceWatchOrchestrator {
    fn drop(&mut self) {
        self.session.lock().cancel();
    }
}
