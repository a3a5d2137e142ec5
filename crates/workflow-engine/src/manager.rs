//! Graph & history manager
//!
//! Owns the editable workflow graph. Every structural edit snapshots the
//! current graph into [`History`] first, then applies the change, then
//! hands the graph to the store. Store failures are logged and never
//! returned from the edit.
//!
//! Operations on ids that do not exist are silent no-ops and leave the
//! history untouched. They report whether anything changed.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::HistoryConfig;
use crate::error::{EngineError, Result};
use crate::history::History;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::simulator::ExecutionReport;
use crate::store::WorkflowStore;
use crate::types::{
    EdgeId, GraphEdge, GraphNode, NodeDataPatch, NodeId, NodeStatus, NodeType, Position, Viewport,
    WorkflowGraph,
};
use crate::validation::conflicting_branch;

/// Authoritative editable workflow with undo/redo
pub struct GraphManager {
    graph: WorkflowGraph,
    history: History,
    /// Node shown in the editor's side panel
    selected_node_id: Option<NodeId>,
    store: Option<Arc<dyn WorkflowStore>>,
    ids: Arc<dyn IdGenerator>,
}

impl GraphManager {
    /// Empty graph, UUID ids, default history limit, no store
    pub fn new() -> Self {
        Self::with_graph(WorkflowGraph::new())
    }

    /// Start from an existing graph with an empty history
    pub fn with_graph(graph: WorkflowGraph) -> Self {
        Self {
            graph,
            history: History::default(),
            selected_node_id: None,
            store: None,
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Persist every durable edit to `store`
    pub fn with_store(mut self, store: Arc<dyn WorkflowStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_history_limit(mut self, max_snapshots: usize) -> Self {
        self.history = History::new(max_snapshots);
        self
    }

    /// Restore the workflow held by `store`
    ///
    /// A missing or unreadable workflow yields an empty graph; read errors
    /// are logged.
    pub fn load(
        store: Arc<dyn WorkflowStore>,
        ids: Arc<dyn IdGenerator>,
        config: &HistoryConfig,
    ) -> Self {
        let graph = match store.load() {
            Ok(Some(graph)) => graph,
            Ok(None) => WorkflowGraph::new(),
            Err(e) => {
                log::error!("Failed to load stored workflow, starting empty: {}", e);
                WorkflowGraph::new()
            }
        };

        Self::with_graph(graph)
            .with_store(store)
            .with_id_generator(ids)
            .with_history_limit(config.max_snapshots)
    }

    /// The current graph
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---------------------------------------------------------------------
    // Structural edits (recorded in history, persisted)
    // ---------------------------------------------------------------------

    /// Place a new idle node with the type's default label
    ///
    /// Non-finite positions are rejected before anything changes.
    pub fn add_node(&mut self, node_type: NodeType, position: Position) -> Result<NodeId> {
        if !position.is_finite() {
            return Err(EngineError::NonFiniteCoordinate {
                location: "new node position".to_string(),
            });
        }
        self.history.record(&self.graph)?;

        let id = self.ids.next_id();
        self.graph
            .nodes
            .push(GraphNode::new(id.clone(), node_type, position));
        log::debug!("Added node {} ({})", id, node_type);

        self.persist();
        Ok(id)
    }

    /// Apply a partial update to a node's data
    ///
    /// A config in the patch replaces the node's config wholesale.
    pub fn update_node_data(&mut self, id: &str, patch: NodeDataPatch) -> Result<bool> {
        if !self.graph.contains_node(id) {
            return Ok(false);
        }
        self.history.record(&self.graph)?;

        if let Some(node) = self.graph.find_node_mut(id) {
            let data = &mut node.data;
            if let Some(config) = patch.config {
                data.config = config;
            }
            if let Some(label) = patch.label.filter(|l| !l.is_empty()) {
                data.label = label;
            }
            if let Some(status) = patch.status {
                data.status = status;
                if status != NodeStatus::Error {
                    data.error = None;
                }
            }
            if let Some(error) = patch.error {
                data.error = Some(error);
            }
        }

        self.persist();
        Ok(true)
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<bool> {
        if !self.graph.contains_node(id) {
            return Ok(false);
        }
        self.history.record(&self.graph)?;

        self.graph.nodes.retain(|n| n.id != id);
        let before = self.graph.edges.len();
        self.graph.edges.retain(|e| !e.touches(id));
        log::debug!(
            "Removed node {} and {} attached edge(s)",
            id,
            before - self.graph.edges.len()
        );

        if self.selected_node_id.as_deref() == Some(id) {
            self.selected_node_id = None;
        }

        self.persist();
        Ok(true)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<bool> {
        if self.graph.find_edge(id).is_none() {
            return Ok(false);
        }
        self.history.record(&self.graph)?;

        self.graph.edges.retain(|e| e.id != id);

        self.persist();
        Ok(true)
    }

    /// Add an edge from `source` to `target`
    ///
    /// Returns the new edge id, or None if either endpoint is unknown.
    /// A second edge on an already used `(source, handle)` pair is
    /// rejected with `EngineError::BranchConflict`.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
    ) -> Result<Option<EdgeId>> {
        if !self.graph.contains_node(source) || !self.graph.contains_node(target) {
            return Ok(None);
        }
        if let Some(existing) = conflicting_branch(&self.graph, source, source_handle) {
            log::warn!(
                "Rejected edge {} -> {}: handle already used by edge {}",
                source,
                target,
                existing.id
            );
            return Err(EngineError::BranchConflict {
                node_id: source.to_string(),
                handle: source_handle.unwrap_or_default().to_string(),
            });
        }
        self.history.record(&self.graph)?;

        let id = self.ids.next_id();
        self.graph.edges.push(GraphEdge::new(
            id.clone(),
            source,
            target,
            source_handle.map(str::to_string),
        ));

        self.persist();
        Ok(Some(id))
    }

    /// Remove every selected node and edge
    ///
    /// Edges left without an endpoint go too. Nothing selected means no
    /// change and no history entry.
    pub fn remove_selected(&mut self) -> Result<bool> {
        if self.selected_count() == 0 {
            return Ok(false);
        }
        self.history.record(&self.graph)?;

        let removed: HashSet<NodeId> = self
            .graph
            .nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect();

        self.graph.nodes.retain(|n| !n.selected);
        self.graph.edges.retain(|e| {
            !e.selected && !removed.contains(&e.source) && !removed.contains(&e.target)
        });

        if let Some(active) = &self.selected_node_id {
            if removed.contains(active) {
                self.selected_node_id = None;
            }
        }

        self.persist();
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Restore the state before the last edit
    ///
    /// Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo(&self.graph) {
            Some(restored) => {
                self.install(restored?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply the last undone edit
    ///
    /// Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo(&self.graph) {
            Some(restored) => {
                self.install(restored?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---------------------------------------------------------------------
    // Editor state (no history, not persisted)
    // ---------------------------------------------------------------------

    /// Non-finite viewports are rejected and leave the graph unchanged
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        if !viewport.is_finite() {
            return Err(EngineError::NonFiniteCoordinate {
                location: "viewport".to_string(),
            });
        }
        self.graph.viewport = viewport;
        Ok(())
    }

    /// Replace all nodes, e.g. after an editor drag
    ///
    /// Edge endpoints are not checked. Nodes with non-finite positions are
    /// rejected and leave the graph unchanged.
    pub fn set_nodes(&mut self, nodes: Vec<GraphNode>) -> Result<()> {
        if let Some(node) = nodes.iter().find(|n| !n.position.is_finite()) {
            return Err(EngineError::NonFiniteCoordinate {
                location: format!("node '{}' position", node.id),
            });
        }
        self.graph.nodes = nodes;
        Ok(())
    }

    pub fn set_edges(&mut self, edges: Vec<GraphEdge>) {
        self.graph.edges = edges;
    }

    /// Set the active node; unknown ids clear it
    pub fn select_node(&mut self, id: Option<&str>) {
        self.selected_node_id = id
            .filter(|id| self.graph.contains_node(id))
            .map(str::to_string);
    }

    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    pub fn selected_node(&self) -> Option<&GraphNode> {
        self.selected_node_id
            .as_deref()
            .and_then(|id| self.graph.find_node(id))
    }

    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.graph.find_node_mut(id) {
            Some(node) => {
                node.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn set_edge_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.graph.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                edge.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Number of selected nodes plus selected edges
    pub fn selected_count(&self) -> usize {
        let nodes = self.graph.nodes.iter().filter(|n| n.selected).count();
        let edges = self.graph.edges.iter().filter(|e| e.selected).count();
        nodes + edges
    }

    // ---------------------------------------------------------------------
    // Run status
    // ---------------------------------------------------------------------

    /// Mirror a progress update into the node's data
    ///
    /// `error` is kept only for the `Error` status.
    pub fn set_node_status(&mut self, id: &str, status: NodeStatus, error: Option<String>) -> bool {
        match self.graph.find_node_mut(id) {
            Some(node) => {
                node.data.status = status;
                node.data.error = if status == NodeStatus::Error { error } else { None };
                true
            }
            None => false,
        }
    }

    /// Merge the final outcomes of a run into the graph
    ///
    /// Nodes deleted since the run started are ignored.
    pub fn apply_report(&mut self, report: &ExecutionReport) {
        for (node_id, outcome) in &report.outcomes {
            self.set_node_status(node_id, outcome.status, outcome.error.clone());
        }
    }

    /// Put every node back to idle
    pub fn reset_statuses(&mut self) {
        for node in &mut self.graph.nodes {
            node.data.status = NodeStatus::Idle;
            node.data.error = None;
        }
    }

    /// Write the current graph to the store, reporting failures
    pub fn save(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.graph),
            None => Ok(()),
        }
    }

    fn install(&mut self, graph: WorkflowGraph) {
        self.graph = graph;
        if let Some(active) = &self.selected_node_id {
            if !self.graph.contains_node(active) {
                self.selected_node_id = None;
            }
        }
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to persist workflow: {}", e);
        }
    }
}

impl Default for GraphManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::simulator::NodeOutcome;
    use crate::store::MemoryWorkflowStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn manager() -> GraphManager {
        GraphManager::new().with_id_generator(Arc::new(SequentialIds::new("id")))
    }

    fn config(value: serde_json::Value) -> crate::types::NodeConfig {
        value.as_object().cloned().unwrap()
    }

    struct FailingStore;

    impl WorkflowStore for FailingStore {
        fn save(&self, _graph: &WorkflowGraph) -> Result<()> {
            Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn load(&self) -> Result<Option<WorkflowGraph>> {
            Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "gone",
            )))
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_node_defaults() {
        let mut m = manager();
        let id = m.add_node(NodeType::ActionHttp, Position::new(5.0, 7.5)).unwrap();

        assert_eq!(id, "id-1");
        let node = m.graph().find_node(&id).unwrap();
        assert_eq!(node.data.label, "HTTP");
        assert!(node.data.config.is_empty());
        assert_eq!(node.data.status, NodeStatus::Idle);
        assert_eq!(node.position, Position::new(5.0, 7.5));
        assert!(m.can_undo());
    }

    #[test]
    fn test_history_bound_keeps_most_recent() {
        let mut m = manager();
        for i in 0..60 {
            m.add_node(NodeType::LogicTransform, Position::new(i as f64, 0.0))
                .unwrap();
        }

        assert_eq!(m.history().past_len(), 50);
        let sizes: Vec<usize> = m
            .history()
            .past_snapshots()
            .unwrap()
            .iter()
            .map(|g| g.nodes.len())
            .collect();
        // Snapshot k was taken right before the k-th add, when k nodes existed
        assert_eq!(sizes, (10..60).collect::<Vec<_>>());
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut m = manager();
        let t = m.add_node(NodeType::TriggerManual, Position::new(0.1, 0.2)).unwrap();
        let h = m.add_node(NodeType::ActionHttp, Position::new(100.3, 0.7)).unwrap();
        m.set_viewport(Viewport {
            x: -12.5,
            y: 3.25,
            zoom: 0.8,
        })
        .unwrap();

        let before = m.graph().clone();
        m.connect(&t, &h, None).unwrap();
        let after = m.graph().clone();

        assert!(m.undo().unwrap());
        assert_eq!(*m.graph(), before);
        assert!(m.redo().unwrap());
        assert_eq!(*m.graph(), after);
    }

    #[test]
    fn test_undo_redo_noop_when_empty() {
        let mut m = manager();
        assert!(!m.undo().unwrap());
        assert!(!m.redo().unwrap());
    }

    #[test]
    fn test_non_finite_coordinates_keep_history_restorable() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::new(1.0, 2.0)).unwrap();
        let before = m.graph().clone();

        let err = m
            .add_node(NodeType::ActionHttp, Position::new(f64::NAN, 0.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteCoordinate { .. }));
        assert!(m
            .set_viewport(Viewport {
                x: 0.0,
                y: f64::INFINITY,
                zoom: 1.0,
            })
            .is_err());
        let mut nodes = m.graph().nodes.clone();
        nodes[0].position.y = f64::NEG_INFINITY;
        assert!(m.set_nodes(nodes).is_err());

        assert_eq!(*m.graph(), before);
        assert_eq!(m.history().past_len(), 1);

        m.add_node(NodeType::ActionSms, Position::new(3.0, 4.0)).unwrap();
        assert!(m.undo().unwrap());
        assert_eq!(*m.graph(), before);
        assert!(m.undo().unwrap());
        assert!(!m.graph().contains_node(&a));
        assert_eq!(m.history().future_len(), 2);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut m = manager();
        m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        m.add_node(NodeType::ActionSms, Position::default()).unwrap();

        m.undo().unwrap();
        assert!(m.can_redo());

        m.add_node(NodeType::ActionEmail, Position::default()).unwrap();
        assert_eq!(m.history().future_len(), 0);

        let snapshot = m.graph().clone();
        assert!(!m.redo().unwrap());
        assert_eq!(*m.graph(), snapshot);
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        let b = m.add_node(NodeType::LogicCondition, Position::default()).unwrap();
        let c = m.add_node(NodeType::ActionHttp, Position::default()).unwrap();
        let d = m.add_node(NodeType::ActionSms, Position::default()).unwrap();

        m.connect(&a, &b, None).unwrap();
        m.connect(&b, &c, Some("true")).unwrap();
        m.connect(&c, &b, None).unwrap();
        let kept = m.connect(&a, &d, None).unwrap().unwrap();
        m.select_node(Some(b.as_str()));

        assert!(m.remove_node(&b).unwrap());
        assert!(!m.graph().contains_node(&b));
        let edge_ids: Vec<&str> = m.graph().edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edge_ids, vec![kept.as_str()]);
        assert_eq!(m.selected_node_id(), None);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        let past = m.history().past_len();

        assert!(!m.remove_node("missing").unwrap());
        assert!(!m.remove_edge("missing").unwrap());
        assert!(!m
            .update_node_data("missing", NodeDataPatch::default().label("x"))
            .unwrap());
        assert_eq!(m.connect(&a, "missing", None).unwrap(), None);
        assert!(!m.set_node_status("missing", NodeStatus::Success, None));

        assert_eq!(m.history().past_len(), past);
    }

    #[test]
    fn test_connect_rejects_duplicate_branch() {
        let mut m = manager();
        let c = m.add_node(NodeType::LogicCondition, Position::default()).unwrap();
        let x = m.add_node(NodeType::ActionHttp, Position::default()).unwrap();
        let y = m.add_node(NodeType::ActionSms, Position::default()).unwrap();

        m.connect(&c, &x, Some("true")).unwrap();
        let past = m.history().past_len();

        let err = m.connect(&c, &y, Some("true")).unwrap_err();
        assert!(matches!(err, EngineError::BranchConflict { ref handle, .. } if handle == "true"));
        assert_eq!(m.history().past_len(), past);

        // Other handle and unlabelled fan-out are fine
        assert!(m.connect(&c, &y, Some("false")).unwrap().is_some());
        assert!(m.connect(&x, &y, None).unwrap().is_some());
        assert!(m.connect(&x, &c, None).unwrap().is_some());
    }

    #[test]
    fn test_update_node_data_replaces_config() {
        let mut m = manager();
        let id = m.add_node(NodeType::ActionHttp, Position::default()).unwrap();

        m.update_node_data(
            &id,
            NodeDataPatch::default().config(config(json!({"url": "https://a", "method": "GET"}))),
        )
        .unwrap();
        m.update_node_data(
            &id,
            NodeDataPatch::default().config(config(json!({"url": "https://b"}))),
        )
        .unwrap();

        let node = m.graph().find_node(&id).unwrap();
        assert_eq!(node.data.config, config(json!({"url": "https://b"})));
        // Label untouched when not in the patch
        assert_eq!(node.data.label, "HTTP");
    }

    #[test]
    fn test_update_node_data_label_and_status() {
        let mut m = manager();
        let id = m.add_node(NodeType::ActionEmail, Position::default()).unwrap();

        m.update_node_data(
            &id,
            NodeDataPatch::default()
                .label("Notify")
                .status(NodeStatus::Error)
                .error("boom"),
        )
        .unwrap();
        let data = &m.graph().find_node(&id).unwrap().data;
        assert_eq!(data.label, "Notify");
        assert_eq!(data.error.as_deref(), Some("boom"));

        m.update_node_data(&id, NodeDataPatch::default().label("").status(NodeStatus::Idle))
            .unwrap();
        let data = &m.graph().find_node(&id).unwrap().data;
        assert_eq!(data.label, "Notify");
        assert_eq!(data.error, None);
    }

    #[test]
    fn test_remove_selected() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        let b = m.add_node(NodeType::LogicTransform, Position::default()).unwrap();
        let c = m.add_node(NodeType::ActionHttp, Position::default()).unwrap();
        let d = m.add_node(NodeType::ActionSms, Position::default()).unwrap();
        let ab = m.connect(&a, &b, None).unwrap().unwrap();
        let cd = m.connect(&c, &d, None).unwrap().unwrap();
        let ad = m.connect(&a, &d, None).unwrap().unwrap();

        // Nothing selected: no-op, no history
        let past = m.history().past_len();
        assert!(!m.remove_selected().unwrap());
        assert_eq!(m.history().past_len(), past);

        m.set_node_selected(&b, true);
        m.set_edge_selected(&cd, true);
        m.select_node(Some(b.as_str()));
        assert_eq!(m.selected_count(), 2);

        assert!(m.remove_selected().unwrap());
        let nodes: Vec<&str> = m.graph().nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(nodes, vec![a.as_str(), c.as_str(), d.as_str()]);
        let edges: Vec<&str> = m.graph().edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(edges, vec![ad.as_str()]);
        assert!(!edges.contains(&ab.as_str()));
        assert_eq!(m.selected_node_id(), None);
        assert_eq!(m.selected_count(), 0);
    }

    #[test]
    fn test_setters_skip_history() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        let past = m.history().past_len();

        m.set_viewport(Viewport {
            x: 1.0,
            y: 2.0,
            zoom: 3.0,
        })
        .unwrap();
        m.select_node(Some(a.as_str()));
        m.set_node_status(&a, NodeStatus::Running, None);
        let mut nodes = m.graph().nodes.clone();
        nodes[0].position = Position::new(40.0, 40.0);
        m.set_nodes(nodes).unwrap();
        m.set_edges(Vec::new());

        assert_eq!(m.history().past_len(), past);
        assert_eq!(m.graph().viewport.zoom, 3.0);
        assert_eq!(m.selected_node().map(|n| n.id.as_str()), Some(a.as_str()));

        m.select_node(Some("missing"));
        assert_eq!(m.selected_node_id(), None);
    }

    #[test]
    fn test_apply_report_and_reset() {
        let mut m = manager();
        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        let b = m.add_node(NodeType::ActionHttp, Position::default()).unwrap();

        let mut outcomes = HashMap::new();
        outcomes.insert(
            a.clone(),
            NodeOutcome {
                status: NodeStatus::Success,
                branch: None,
                error: None,
            },
        );
        outcomes.insert(
            b.clone(),
            NodeOutcome {
                status: NodeStatus::Error,
                branch: None,
                error: Some("Missing configuration".into()),
            },
        );
        outcomes.insert(
            "deleted".into(),
            NodeOutcome {
                status: NodeStatus::Skipped,
                branch: None,
                error: None,
            },
        );
        let report = ExecutionReport {
            execution_id: "run".into(),
            order: vec![a.clone(), b.clone(), "deleted".into()],
            outcomes,
            warnings: Vec::new(),
            unreachable: Vec::new(),
        };

        m.apply_report(&report);
        assert_eq!(m.graph().find_node(&a).unwrap().data.status, NodeStatus::Success);
        let b_data = &m.graph().find_node(&b).unwrap().data;
        assert_eq!(b_data.status, NodeStatus::Error);
        assert_eq!(b_data.error.as_deref(), Some("Missing configuration"));

        m.reset_statuses();
        assert!(m
            .graph()
            .nodes
            .iter()
            .all(|n| n.data.status == NodeStatus::Idle && n.data.error.is_none()));
    }

    #[test]
    fn test_edits_are_persisted() {
        let store = Arc::new(MemoryWorkflowStore::new());
        let mut m = manager().with_store(store.clone());

        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), *m.graph());

        m.remove_node(&a).unwrap();
        assert!(store.load().unwrap().unwrap().nodes.is_empty());

        m.undo().unwrap();
        assert_eq!(store.load().unwrap().unwrap().nodes.len(), 1);
    }

    #[test]
    fn test_persistence_failure_is_swallowed() {
        let mut m = manager().with_store(Arc::new(FailingStore));

        let a = m.add_node(NodeType::TriggerManual, Position::default()).unwrap();
        assert!(m.graph().contains_node(&a));
        assert!(m.save().is_err());
    }

    #[test]
    fn test_load_from_store() {
        let store = Arc::new(MemoryWorkflowStore::new());
        {
            let mut m = manager().with_store(store.clone());
            m.add_node(NodeType::TriggerWebhook, Position::new(1.0, 1.0)).unwrap();
        }

        let config = HistoryConfig { max_snapshots: 5 };
        let m = GraphManager::load(store, Arc::new(SequentialIds::new("n")), &config);
        assert_eq!(m.graph().nodes.len(), 1);
        assert!(!m.can_undo());
        assert_eq!(m.history().max_snapshots(), 5);

        let m = GraphManager::load(Arc::new(FailingStore), Arc::new(UuidGenerator), &config);
        assert!(m.graph().nodes.is_empty());
    }
}
