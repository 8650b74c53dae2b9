//! Saving and restoring the whole workspace as JSON on disk.

use crate::project::Workspace;
use crate::util::time;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during workspace persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to serialize workspace: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write workspace: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to read workspace file: {0}")]
    Read(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A serializable capture of the workspace: every project with its layers,
/// object logs and history. Live surfaces are not stored; they are rebuilt
/// from layer snapshots on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub workspace: Workspace,
    /// Seconds since the UNIX epoch when the snapshot was taken
    pub timestamp: u64,
    /// Crate version that wrote the snapshot
    pub version: String,
}

impl WorkspaceSnapshot {
    pub fn new(workspace: &Workspace) -> Self {
        Self {
            workspace: workspace.clone(),
            timestamp: time::timestamp_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn restore(self) -> Workspace {
        if self.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "workspace snapshot written by version {}, running {}",
                self.version,
                env!("CARGO_PKG_VERSION")
            );
        }
        self.workspace
    }
}

/// Manages workspace save files and rotating autosaves in one directory.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    dir: PathBuf,
    max_autosaves: usize,
}

impl WorkspaceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_autosaves: 5,
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Save a snapshot under a name, creating the directory if needed.
    pub fn save(&self, workspace: &Workspace, name: &str) -> PersistenceResult<()> {
        let snapshot = WorkspaceSnapshot::new(workspace);
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(self.path_for(name), json)?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> PersistenceResult<WorkspaceSnapshot> {
        let json = fs::read_to_string(self.path_for(name))
            .map_err(|e| PersistenceError::Read(e.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write a timestamped autosave and prune the oldest ones past the
    /// retention limit.
    pub fn autosave(&self, workspace: &Workspace) -> PersistenceResult<()> {
        self.save(workspace, &format!("autosave_{}", time::timestamp_secs()))?;
        self.prune_autosaves()
    }

    fn prune_autosaves(&self) -> PersistenceResult<()> {
        let mut autosaves: Vec<_> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("autosave_"))
            .collect();
        autosaves.sort_by_key(|entry| {
            entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });
        while autosaves.len() > self.max_autosaves {
            let oldest = autosaves.remove(0);
            fs::remove_file(oldest.path())?;
        }
        Ok(())
    }

    /// Most recently modified autosave file name, if any.
    pub fn find_latest_autosave(&self) -> PersistenceResult<Option<String>> {
        if !Path::new(&self.dir).exists() {
            return Ok(None);
        }
        let mut latest: Option<(std::time::SystemTime, String)> = None;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("autosave_") {
                continue;
            }
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                if latest.as_ref().is_none_or(|(t, _)| modified > *t) {
                    latest = Some((modified, name));
                }
            }
        }
        Ok(latest.map(|(_, name)| name.trim_end_matches(".json").to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("paintboard-store-{}", uuid::Uuid::new_v4()));
        let store = WorkspaceStore::new(&dir);
        let mut workspace = Workspace::new();
        workspace.create_project("Sketch", 640, 480).unwrap();

        store.save(&workspace, "manual").unwrap();
        let restored = store.load("manual").unwrap().restore();
        assert_eq!(restored, workspace);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn latest_autosave_on_empty_dir_is_none() {
        let dir = std::env::temp_dir().join(format!("paintboard-store-{}", uuid::Uuid::new_v4()));
        let store = WorkspaceStore::new(&dir);
        assert!(store.find_latest_autosave().unwrap().is_none());
    }
}
