use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use workspace_watch::service::{StaticTopology, WatchListener, WatchServiceRegistry};
use workspace_watch::types::{FileEvent, FileEventKind, ProjectRoot, WorkspaceIdentity};
use workspace_watch::watcher::{ManualFacility, StreamState};
use workspace_watch::WatchConfig;

fn quiet_config() -> WatchConfig {
    WatchConfig {
        publish_interval: Duration::from_secs(3600),
        reconcile_interval: Duration::from_secs(3600),
        ..WatchConfig::default()
    }
}

fn registry(topology: Arc<StaticTopology>, facility: &ManualFacility) -> WatchServiceRegistry {
    WatchServiceRegistry::new(topology, Arc::new(facility.clone()), quiet_config())
}

#[tokio::test]
async fn test_watch_is_idempotent_per_workspace() {
    let root = ProjectRoot::new("/ws/App");
    let topology = Arc::new(StaticTopology::new(vec![root.clone()]));
    topology.set_files(&root, ["main.swift"]);
    let facility = ManualFacility::new();
    let registry = registry(topology.clone(), &facility);

    let workspace = WorkspaceIdentity::new("/ws");
    let first = registry.watch(workspace.clone(), |_| {}).await;
    let second = registry.watch(workspace.clone(), |_| {}).await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
    assert_eq!(facility.streams_created(), 1);
    assert_eq!(topology.resolutions(), 1);
    assert_eq!(registry.get_files(&workspace).map(|f| f.len()), Some(1));
}

#[tokio::test]
async fn test_workspaces_get_separate_orchestrators() {
    let topology = Arc::new(StaticTopology::new(vec![ProjectRoot::new("/shared")]));
    let facility = ManualFacility::new();
    let registry = registry(topology, &facility);

    let a = registry.watch(WorkspaceIdentity::new("/a"), |_| {}).await;
    let b = registry.watch(WorkspaceIdentity::new("/b"), |_| {}).await;

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 2);
    assert_eq!(facility.streams_created(), 2);
}

#[tokio::test]
async fn test_first_callback_wins() {
    let root = ProjectRoot::new("/ws/App");
    let other = ProjectRoot::new("/ws/Lib");
    let topology = Arc::new(StaticTopology::new(vec![root.clone()]));
    topology.set_files(&other, ["lib.swift"]);
    let facility = ManualFacility::new();
    let registry = registry(topology.clone(), &facility);

    let first_batches = Arc::new(Mutex::new(Vec::<Vec<FileEvent>>::new()));
    let second_batches = Arc::new(Mutex::new(Vec::<Vec<FileEvent>>::new()));
    let sink = first_batches.clone();
    let workspace = WorkspaceIdentity::new("/ws");
    registry
        .watch(workspace.clone(), move |batch| sink.lock().push(batch))
        .await;
    let sink = second_batches.clone();
    let orchestrator = registry
        .watch(workspace, move |batch| sink.lock().push(batch))
        .await;

    topology.set_roots(vec![root, other]);
    orchestrator.reconcile_once().await;

    let expected = FileEvent::for_path(Path::new("/ws/Lib/lib.swift"), FileEventKind::Created);
    assert_eq!(*first_batches.lock(), vec![vec![expected.unwrap()]]);
    assert!(second_batches.lock().is_empty());
}

#[tokio::test]
async fn test_unwatch_tears_down_and_allows_rewatch() {
    let root = ProjectRoot::new("/ws/App");
    let topology = Arc::new(StaticTopology::new(vec![root.clone()]));
    topology.set_files(&root, ["main.swift"]);
    let facility = ManualFacility::new();
    let registry = registry(topology, &facility);
    let workspace = WorkspaceIdentity::new("/ws");

    let first = registry.watch(workspace.clone(), |_| {}).await;
    assert!(registry.unwatch(&workspace));

    assert!(!first.is_watching());
    assert!(registry.get(&workspace).is_none());
    assert!(registry.get_files(&workspace).is_none());
    assert_eq!(facility.stream_state(0), Some(StreamState::Invalidated));

    let second = registry.watch(workspace.clone(), |_| {}).await;
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(facility.streams_created(), 2);
}

#[tokio::test]
async fn test_sentinel_workspace_is_registered_but_inert() {
    let topology = Arc::new(StaticTopology::new(vec![ProjectRoot::new("/ws")]));
    let facility = ManualFacility::new();
    let registry = registry(topology.clone(), &facility);

    let orchestrator = registry.watch(WorkspaceIdentity::new("/"), |_| {}).await;

    assert!(!orchestrator.is_watching());
    assert_eq!(facility.streams_created(), 0);
    assert_eq!(topology.resolutions(), 0);
}

#[tokio::test]
async fn test_index_is_shared_with_consumers() {
    let root = ProjectRoot::new("/ws/App");
    let topology = Arc::new(StaticTopology::new(vec![root.clone()]));
    topology.set_files(&root, ["main.swift"]);
    let facility = ManualFacility::new();
    let registry = registry(topology, &facility);
    let workspace = WorkspaceIdentity::new("/ws");
    registry.watch(workspace.clone(), |_| {}).await;

    let edited = workspace_watch::FileReference::new(root.path(), "/ws/App/edited.swift");
    assert!(registry.index().add_file(&workspace, edited.clone()));
    assert_eq!(registry.get_files(&workspace).map(|f| f.len()), Some(2));

    registry.index().remove_file(&workspace, &edited);
    assert_eq!(registry.get_files(&workspace).map(|f| f.len()), Some(1));
}

/// Unwatches its own workspace from inside the first batch it receives.
#[derive(Default)]
struct Unwatching {
    registry: OnceLock<Weak<WatchServiceRegistry>>,
    batches: AtomicUsize,
}

impl WatchListener for Unwatching {
    fn on_batch(&self, workspace: &WorkspaceIdentity, _batch: Vec<FileEvent>) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
            registry.unwatch(workspace);
        }
    }
}

/// Runs `scenario` on its own thread and reports whether it finished in time.
fn finishes_within(limit: Duration, scenario: impl FnOnce() + Send + 'static) -> bool {
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        scenario();
        let _ = done_tx.send(());
    });
    done_rx.recv_timeout(limit).is_ok()
}

#[test]
fn test_unwatch_from_inside_a_batch_returns() {
    let finished = finishes_within(Duration::from_secs(5), || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let root = ProjectRoot::new("/ws/App");
            let topology = Arc::new(StaticTopology::new(vec![root.clone()]));
            topology.set_files(&root, ["main.swift"]);
            let facility = ManualFacility::new();
            let config = WatchConfig {
                publish_interval: Duration::from_millis(20),
                ..quiet_config()
            };
            let registry = Arc::new(WatchServiceRegistry::new(
                topology,
                Arc::new(facility.clone()),
                config,
            ));
            let listener = Arc::new(Unwatching::default());
            let _ = listener.registry.set(Arc::downgrade(&registry));

            let workspace = WorkspaceIdentity::new("/ws");
            let orchestrator = registry
                .watch_with_listener(workspace.clone(), listener.clone())
                .await;
            // The registry now holds the only strong handle.
            drop(orchestrator);

            facility.emit_created("/ws/App/new.swift");
            tokio::time::sleep(Duration::from_millis(300)).await;

            assert_eq!(listener.batches.load(Ordering::SeqCst), 1);
            assert!(registry.get(&workspace).is_none());
            assert_eq!(registry.get_files(&workspace), None);
            assert_eq!(facility.stream_state(0), Some(StreamState::Invalidated));
        });
    });
    assert!(finished, "unwatch from inside a batch hung");
}
