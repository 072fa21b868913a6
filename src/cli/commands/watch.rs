//! Watch command: print live and synthetic batches until interrupted.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use url::Url;

use crate::config::Settings;
use crate::service::{FilesystemTopology, WatchListener, WatchServiceRegistry};
use crate::types::{FileEvent, WorkspaceIdentity};
use crate::watcher::NotifyFacility;

struct PrintListener {
    json: bool,
}

impl WatchListener for PrintListener {
    fn on_bootstrap(&self, workspace: &WorkspaceIdentity, files: Vec<Url>) {
        eprintln!("{workspace}: bootstrap with {} files", files.len());
    }

    fn on_batch(&self, _workspace: &WorkspaceIdentity, batch: Vec<FileEvent>) {
        if self.json {
            match serde_json::to_string(&batch) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: {e}"),
            }
            return;
        }

        let stamp = Local::now().format("%H:%M:%S%.3f");
        for event in batch {
            println!("{stamp} {:<7} {}", event.kind, event.uri);
        }
    }
}

pub async fn run(workspace: &Path, json: bool, settings: &Settings) -> anyhow::Result<()> {
    let registry = WatchServiceRegistry::new(
        Arc::new(FilesystemTopology::from_settings(&settings.enumerator)),
        Arc::new(NotifyFacility::new()),
        settings.watch_config(),
    );

    let workspace = WorkspaceIdentity::new(workspace);
    let orchestrator = registry
        .watch_with_listener(workspace.clone(), Arc::new(PrintListener { json }))
        .await;

    eprintln!(
        "watching {} project roots (live: {}), Ctrl-C to stop",
        orchestrator.project_roots().len(),
        orchestrator.has_live_watcher()
    );

    tokio::signal::ctrl_c().await?;
    registry.unwatch(&workspace);
    Ok(())
}
