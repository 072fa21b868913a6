//! Process-wide table of one orchestrator per workspace.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::orchestrator::{
    CallbackListener, OrchestratorContext, WatchListener, WorkspaceWatchOrchestrator,
};
use super::provider::{FilesystemTopology, TopologyProvider};
use crate::config::WatchConfig;
use crate::indexing::WorkspaceFileIndex;
use crate::types::{FileEvent, FileReference, WorkspaceIdentity};
use crate::watcher::{NotifyFacility, WatchFacility};

/// Entry point for the rest of the application.
///
/// `watch` is idempotent per workspace: the first call creates and starts an
/// orchestrator, later calls return the same one and ignore their listener.
pub struct WatchServiceRegistry {
    context: OrchestratorContext,
    orchestrators: DashMap<WorkspaceIdentity, Arc<WorkspaceWatchOrchestrator>>,
}

static GLOBAL: OnceLock<WatchServiceRegistry> = OnceLock::new();

impl WatchServiceRegistry {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        facility: Arc<dyn WatchFacility>,
        config: WatchConfig,
    ) -> Self {
        let index = Arc::new(WorkspaceFileIndex::with_cap(config.index_cap));
        Self {
            context: OrchestratorContext {
                topology,
                facility,
                index,
                config,
            },
            orchestrators: DashMap::new(),
        }
    }

    /// The shared registry: notify-backed watching over the real filesystem.
    pub fn global() -> &'static WatchServiceRegistry {
        GLOBAL.get_or_init(|| {
            WatchServiceRegistry::new(
                Arc::new(FilesystemTopology::default()),
                Arc::new(NotifyFacility::new()),
                WatchConfig::default(),
            )
        })
    }

    /// Watch `workspace`, delivering batches to `callback`.
    ///
    /// A plain callback only sees batches. The inline bootstrap list is not
    /// passed to it; read it from
    /// [`bootstrap_files`](WorkspaceWatchOrchestrator::bootstrap_files) on the
    /// returned orchestrator, or use [`watch_with_listener`](Self::watch_with_listener).
    pub async fn watch<F>(
        &self,
        workspace: WorkspaceIdentity,
        callback: F,
    ) -> Arc<WorkspaceWatchOrchestrator>
    where
        F: Fn(Vec<FileEvent>) + Send + Sync + 'static,
    {
        self.watch_with_listener(workspace, Arc::new(CallbackListener::new(callback)))
            .await
    }

    /// Watch `workspace` with a listener that also receives the bootstrap list.
    pub async fn watch_with_listener(
        &self,
        workspace: WorkspaceIdentity,
        listener: Arc<dyn WatchListener>,
    ) -> Arc<WorkspaceWatchOrchestrator> {
        let orchestrator = match self.orchestrators.entry(workspace.clone()) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => {
                let orchestrator = Arc::new(WorkspaceWatchOrchestrator::new(
                    workspace,
                    self.context.clone(),
                    listener,
                ));
                entry.insert(orchestrator.clone());
                orchestrator
            }
        };

        // Started outside the map shard lock; enumeration can take a while.
        orchestrator.start_watching().await;
        orchestrator
    }

    /// The orchestrator for `workspace`, if one is registered.
    pub fn get(&self, workspace: &WorkspaceIdentity) -> Option<Arc<WorkspaceWatchOrchestrator>> {
        self.orchestrators.get(workspace).map(|o| o.value().clone())
    }

    /// Stop watching `workspace` and forget its files. Returns whether it was watched.
    pub fn unwatch(&self, workspace: &WorkspaceIdentity) -> bool {
        let Some((_, orchestrator)) = self.orchestrators.remove(workspace) else {
            return false;
        };
        orchestrator.stop_watching();
        self.context.index.remove_workspace(workspace);
        crate::log_event!("registry", "unwatched", "{workspace}");
        true
    }

    /// Files currently indexed for `workspace`.
    pub fn get_files(&self, workspace: &WorkspaceIdentity) -> Option<Vec<FileReference>> {
        self.context.index.get_files(workspace)
    }

    /// The shared index, for consumers applying edits they observed themselves.
    pub fn index(&self) -> &Arc<WorkspaceFileIndex> {
        &self.context.index
    }

    pub fn config(&self) -> &WatchConfig {
        &self.context.config
    }

    /// Number of registered workspaces.
    pub fn len(&self) -> usize {
        self.orchestrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orchestrators.is_empty()
    }
}
