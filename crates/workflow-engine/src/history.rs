//! Undo/redo history using compressed snapshots
//!
//! Two stacks of full graph snapshots: `past` holds the states captured
//! right before each mutation (oldest evicted first once the limit is
//! reached), `future` holds the states undone since the last mutation.
//! Snapshots are stored as zstd-compressed JSON, which keeps fifty copies
//! of a large graph cheap while still restoring an exact copy.

use std::collections::VecDeque;

use crate::constants::defaults;
use crate::error::{EngineError, Result};
use crate::types::WorkflowGraph;

/// Bounded undo/redo log of compressed graph snapshots
pub struct History {
    /// Pre-mutation states, oldest first
    past: VecDeque<Vec<u8>>,
    /// Undone states, most recently undone last
    future: Vec<Vec<u8>>,
    /// Maximum number of `past` entries to keep
    max_snapshots: usize,
}

impl History {
    /// Create a history that retains at most `max_snapshots` undo steps
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Record the state that is about to be mutated
    ///
    /// Any redo branch is discarded: a new edit invalidates it. Graphs
    /// with NaN or infinite coordinates are refused.
    pub fn record(&mut self, current: &WorkflowGraph) -> Result<()> {
        let compressed = compress(current)?;
        self.push_past(compressed);
        self.future.clear();
        Ok(())
    }

    /// Step back one snapshot
    ///
    /// `current` is moved onto the redo stack. Returns the state to
    /// install, or None if there is nothing to undo. On error both stacks
    /// are left as they were.
    pub fn undo(&mut self, current: &WorkflowGraph) -> Option<Result<WorkflowGraph>> {
        let previous = self.past.back()?;
        let moved = decompress(previous).and_then(|graph| Ok((graph, compress(current)?)));
        Some(moved.map(|(graph, compressed)| {
            self.past.pop_back();
            self.future.push(compressed);
            graph
        }))
    }

    /// Step forward one snapshot
    ///
    /// `current` is moved back onto the undo stack. Returns the state to
    /// install, or None if there is nothing to redo. On error both stacks
    /// are left as they were.
    pub fn redo(&mut self, current: &WorkflowGraph) -> Option<Result<WorkflowGraph>> {
        let next = self.future.last()?;
        let moved = decompress(next).and_then(|graph| Ok((graph, compress(current)?)));
        Some(moved.map(|(graph, compressed)| {
            self.future.pop();
            self.push_past(compressed);
            graph
        }))
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo steps held
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redo steps held
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    /// Decode the undo stack, oldest first
    pub fn past_snapshots(&self) -> Result<Vec<WorkflowGraph>> {
        self.past.iter().map(|bytes| decompress(bytes)).collect()
    }

    /// Drop both stacks
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Get the total compressed size of all snapshots
    pub fn compressed_size(&self) -> usize {
        self.past.iter().chain(self.future.iter()).map(|s| s.len()).sum()
    }

    fn push_past(&mut self, compressed: Vec<u8>) {
        self.past.push_back(compressed);
        while self.past.len() > self.max_snapshots {
            self.past.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(defaults::HISTORY_LIMIT)
    }
}

fn compress(graph: &WorkflowGraph) -> Result<Vec<u8>> {
    if let Some(location) = graph.non_finite_coordinate() {
        return Err(EngineError::NonFiniteCoordinate { location });
    }
    let json = serde_json::to_vec(graph)?;
    zstd::encode_all(&json[..], defaults::SNAPSHOT_COMPRESSION_LEVEL)
        .map_err(|e| EngineError::Compression(e.to_string()))
}

fn decompress(compressed: &[u8]) -> Result<WorkflowGraph> {
    let json = zstd::decode_all(compressed).map_err(|e| EngineError::Compression(e.to_string()))?;
    let graph: WorkflowGraph = serde_json::from_slice(&json)?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphNode, NodeType, Position};

    fn make_graph(label: &str) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        let mut node = GraphNode::new("node1", NodeType::LogicTransform, Position::new(1.25, -3.5));
        node.data.label = label.to_string();
        graph.nodes.push(node);
        graph
    }

    fn label(graph: &WorkflowGraph) -> &str {
        &graph.nodes[0].data.label
    }

    #[test]
    fn test_record_and_undo() {
        let mut history = History::new(10);

        history.record(&make_graph("first")).unwrap();
        history.record(&make_graph("second")).unwrap();
        let current = make_graph("third");

        let undone = history.undo(&current).unwrap().unwrap();
        assert_eq!(label(&undone), "second");
        assert_eq!(history.future_len(), 1);

        let undone = history.undo(&undone).unwrap().unwrap();
        assert_eq!(label(&undone), "first");

        // Can't undo further
        assert!(history.undo(&undone).is_none());
        assert_eq!(history.future_len(), 2);
    }

    #[test]
    fn test_redo_restores_exact_state() {
        let mut history = History::new(10);
        let before = make_graph("before");
        let after = make_graph("after");

        history.record(&before).unwrap();

        let undone = history.undo(&after).unwrap().unwrap();
        assert_eq!(undone, before);

        let redone = history.redo(&undone).unwrap().unwrap();
        assert_eq!(redone, after);
        assert!(history.redo(&redone).is_none());
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(10);

        history.record(&make_graph("first")).unwrap();
        history.undo(&make_graph("second"));
        assert!(history.can_redo());

        history.record(&make_graph("first")).unwrap();
        assert!(!history.can_redo());
        assert!(history.redo(&make_graph("third")).is_none());
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut history = History::new(3);

        for i in 0..5 {
            history.record(&make_graph(&format!("graph_{}", i))).unwrap();
        }

        assert_eq!(history.past_len(), 3);
        let labels: Vec<String> = history
            .past_snapshots()
            .unwrap()
            .iter()
            .map(|g| label(g).to_string())
            .collect();
        assert_eq!(labels, vec!["graph_2", "graph_3", "graph_4"]);
    }

    #[test]
    fn test_redo_respects_limit() {
        let mut history = History::new(2);
        history.record(&make_graph("a")).unwrap();
        history.record(&make_graph("b")).unwrap();

        let state = history.undo(&make_graph("c")).unwrap().unwrap();
        history.record(&state).unwrap();
        let state = history.undo(&make_graph("d")).unwrap().unwrap();
        history.redo(&state).unwrap().unwrap();

        assert!(history.past_len() <= 2);
    }

    #[test]
    fn test_non_finite_graph_not_recorded() {
        let mut history = History::new(10);
        history.record(&make_graph("ok")).unwrap();

        let mut bad = make_graph("bad");
        bad.nodes[0].position.x = f64::NAN;
        let err = history.record(&bad).unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteCoordinate { .. }));
        assert_eq!(history.past_len(), 1);

        // Undoing from a non-finite current state keeps both stacks intact
        assert!(history.undo(&bad).unwrap().is_err());
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn test_undecodable_snapshot_leaves_stacks_intact() {
        let mut history = History::new(10);
        history.record(&make_graph("first")).unwrap();
        history.push_past(b"not zstd".to_vec());

        assert!(history.undo(&make_graph("current")).unwrap().is_err());
        assert_eq!(history.past_len(), 2);
        assert_eq!(history.future_len(), 0);

        history.past.pop_back();
        history.future.push(b"not zstd".to_vec());
        assert!(history.redo(&make_graph("current")).unwrap().is_err());
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 1);
    }

    #[test]
    fn test_zero_limit_clamped() {
        let mut history = History::new(0);
        assert_eq!(history.max_snapshots(), 1);

        history.record(&make_graph("a")).unwrap();
        history.record(&make_graph("b")).unwrap();
        assert_eq!(history.past_len(), 1);
        assert!(history.compressed_size() > 0);

        history.clear();
        assert!(!history.can_undo());
        assert_eq!(history.compressed_size(), 0);
    }
}
