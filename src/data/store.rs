//! Shared handle on the graph
//!
//! One coarse reader/writer lock guards the whole graph. Mutating services
//! hold the write guard for the full operation so both sides of every
//! membership link change together; read views hold the read guard so they
//! always see a consistent graph.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::graph::Graph;

#[derive(Debug, Default)]
pub struct Store {
    graph: RwLock<Graph>,
}

impl Store {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.graph.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.graph.write()
    }

    /// Deep copy of the current graph, for persistence
    pub fn snapshot(&self) -> Graph {
        self.graph.read().clone()
    }

    /// Replace the whole graph, rebuilding derived indices
    pub fn restore(&self, mut graph: Graph) {
        graph.rebuild_index();
        self.replace(graph);
    }

    /// Drop every user, conversation and message
    pub fn clear(&self) {
        self.replace(Graph::new());
    }

    fn replace(&self, mut graph: Graph) {
        let mut current = self.graph.write();
        graph.set_generation(current.generation() + 1);
        *current = graph;
    }
}
