//! Files command: resolve a workspace and enumerate every project root.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Settings;
use crate::service::{FilesystemTopology, TopologyProvider};
use crate::types::WorkspaceIdentity;

#[derive(Debug, Serialize)]
struct FileEntry {
    root: PathBuf,
    path: PathBuf,
    relative_path: PathBuf,
    file_name: String,
}

pub fn run(workspace: &Path, json: bool, settings: &Settings) -> anyhow::Result<()> {
    let topology = FilesystemTopology::from_settings(&settings.enumerator);
    let workspace = WorkspaceIdentity::new(workspace);

    let mut entries = Vec::new();
    for root in topology.project_roots(&workspace) {
        for file in topology.enumerate_files(&root) {
            entries.push(FileEntry {
                root: root.path().to_path_buf(),
                path: file.absolute_path().to_path_buf(),
                relative_path: file.relative_path().to_path_buf(),
                file_name: file.file_name().to_string(),
            });
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", entry.relative_path.display());
        }
        eprintln!("{} files", entries.len());
    }
    Ok(())
}
