//! Workflow persistence
//!
//! A store holds exactly one workflow under a fixed key. Saving is
//! best-effort from the manager's point of view: it logs failures and
//! carries on, so stores are free to return errors.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::constants::storage;
use crate::error::{EngineError, Result};
use crate::types::WorkflowGraph;

/// Durable home of the single edited workflow
pub trait WorkflowStore: Send + Sync {
    /// Overwrite the stored workflow
    fn save(&self, graph: &WorkflowGraph) -> Result<()>;

    /// Read the stored workflow, if any
    fn load(&self) -> Result<Option<WorkflowGraph>>;

    /// Forget the stored workflow
    fn clear(&self) -> Result<()>;
}

/// Stores the workflow as a JSON file inside a directory
///
/// The directory is created on first save. Saves go to a sibling
/// `.tmp` file that is then renamed over the workflow file, so a crash
/// mid-write leaves the previous workflow readable.
#[derive(Debug, Clone)]
pub struct FileWorkflowStore {
    path: PathBuf,
}

impl FileWorkflowStore {
    /// Store under `dir` using the default file name
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_file_name(dir, storage::WORKFLOW_FILE)
    }

    pub fn with_file_name(dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: dir.as_ref().join(file_name),
        }
    }

    /// Full path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WorkflowStore for FileWorkflowStore {
    fn save(&self, graph: &WorkflowGraph) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(graph)?;

        let temp_path = self.temp_path();
        if let Err(e) = std::fs::write(&temp_path, content) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        std::fs::rename(&temp_path, &self.path)?;
        log::debug!(
            "Saved workflow ({} nodes, {} edges) to {:?}",
            graph.nodes.len(),
            graph.edges.len(),
            self.path
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<WorkflowGraph>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let graph = serde_json::from_str(&content)?;
        log::info!("Loaded workflow from {:?}", self.path);
        Ok(Some(graph))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            log::debug!("Deleted workflow file {:?}", self.path);
        }
        Ok(())
    }
}

/// In-process store holding the serialized workflow
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    data: Mutex<Option<String>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything has been saved
    pub fn is_empty(&self) -> bool {
        self.data.lock().map(|d| d.is_none()).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<String>>> {
        self.data
            .lock()
            .map_err(|_| EngineError::Io(io::Error::other("memory workflow store lock poisoned")))
    }
}

impl WorkflowStore for MemoryWorkflowStore {
    fn save(&self, graph: &WorkflowGraph) -> Result<()> {
        let json = serde_json::to_string(graph)?;
        *self.lock()? = Some(json);
        Ok(())
    }

    fn load(&self) -> Result<Option<WorkflowGraph>> {
        let json = self.lock()?.clone();
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphEdge, GraphNode, NodeType, Position};
    use tempfile::TempDir;

    fn sample_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        graph.nodes.push(GraphNode::new("t", NodeType::TriggerWebhook, Position::new(0.0, 0.0)));
        graph.nodes.push(GraphNode::new("h", NodeType::ActionHttp, Position::new(200.0, 40.0)));
        graph.edges.push(GraphEdge::new("e", "t", "h", None));
        graph.viewport.zoom = 0.75;
        graph
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("data");

        {
            let store = FileWorkflowStore::new(&dir);
            assert!(store.load().unwrap().is_none());
            store.save(&sample_graph()).unwrap();
        }

        let store = FileWorkflowStore::new(&dir);
        assert!(store.path().ends_with("workflow_builder_data.json"));
        assert_eq!(store.load().unwrap(), Some(sample_graph()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileWorkflowStore::with_file_name(temp_dir.path(), "wf.json");
        std::fs::write(store.path(), "[1, 2").unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn test_file_store_replaces_atomically() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileWorkflowStore::new(temp_dir.path());
        store.save(&sample_graph()).unwrap();

        // An interrupted save leaves only a partial temp file behind
        std::fs::write(store.temp_path(), "{\"nodes\": [").unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_graph()));

        let mut updated = sample_graph();
        updated.viewport.zoom = 2.0;
        store.save(&updated).unwrap();
        assert_eq!(store.load().unwrap(), Some(updated));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_memory_store_poisoned_lock_reports_errors() {
        let store = std::sync::Arc::new(MemoryWorkflowStore::new());
        let holder = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.data.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(store.save(&sample_graph()).is_err());
        assert!(store.load().is_err());
        assert!(store.clear().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryWorkflowStore::new();
        assert!(store.is_empty());
        assert!(store.load().unwrap().is_none());

        store.save(&sample_graph()).unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.load().unwrap(), Some(sample_graph()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
