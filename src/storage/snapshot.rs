//! Graph snapshots on local disk
//!
//! The whole graph is written as one pretty-printed JSON document. Writes
//! go to a temporary file in the same directory that is then renamed over
//! the previous snapshot, so a crash mid-write leaves the old one intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::data::Graph;
use crate::error::AppError;
use crate::metrics::SNAPSHOTS_TOTAL;

/// Snapshot file location
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `graph` atomically
    pub fn save(&self, graph: &Graph) -> Result<(), AppError> {
        let result = self.write(graph);
        let status = if result.is_ok() { "success" } else { "failure" };
        SNAPSHOTS_TOTAL.with_label_values(&[status]).inc();
        result
    }

    fn write(&self, graph: &Graph) -> Result<(), AppError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory)?;

        let mut file = NamedTempFile::new_in(&directory)?;
        serde_json::to_writer_pretty(&mut file, graph)
            .map_err(|e| AppError::Storage(format!("Failed to serialize snapshot: {}", e)))?;
        file.flush()?;
        file.persist(&self.path)
            .map_err(|e| AppError::Storage(format!("Failed to persist snapshot: {}", e)))?;

        tracing::debug!(path = %self.path.display(), "Snapshot written");
        Ok(())
    }

    /// Read the last snapshot; an absent file is an empty graph
    pub fn load(&self) -> Result<Graph, AppError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No snapshot found, starting empty");
                return Ok(Graph::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut graph: Graph = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Storage(format!("Corrupt snapshot: {}", e)))?;
        graph.rebuild_index();

        tracing::info!(
            path = %self.path.display(),
            users = graph.users().len(),
            messages = graph.messages().len(),
            "Snapshot loaded"
        );
        Ok(graph)
    }
}
