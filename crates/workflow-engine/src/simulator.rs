//! Simulated workflow execution
//!
//! Runs the nodes of a graph one at a time in topological order, with a
//! timed yield standing in for real I/O. Condition nodes choose a branch
//! through an injectable [`BranchDecider`]; everything else emits the
//! `default` token. A node is executed only if it is reachable under the
//! branch decisions made so far, otherwise it is skipped, and skips
//! propagate to its descendants.
//!
//! # Reachability
//!
//! Looking only at incoming edges whose source has already been processed
//! in this run:
//!
//! - no such edges: reachable (triggers, and nodes fed only from outside
//!   the order or through a dropped cycle edge)
//! - otherwise reachable iff at least one edge is live, where an edge is
//!   live when its source succeeded and either emitted `default` or
//!   emitted the token equal to the edge's `source_handle`
//!
//! Skipped and failed nodes emit no token, so their outgoing edges are
//! never live.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::constants::ACTION_TARGET_FIELDS;
use crate::error::{EngineError, Result};
use crate::events::ProgressSink;
use crate::scheduler::{compute_order, ExecutionOrder};
use crate::types::{GraphNode, NodeId, NodeStatus, WorkflowGraph, DEFAULT_BRANCH};
use crate::validation::{validate_structure, GraphIssue};

/// Chooses the outcome of a condition node
///
/// Closures of the form `Fn(&GraphNode) -> bool` are deciders too.
pub trait BranchDecider: Send + Sync {
    /// `true` takes the "true" handle, `false` the "false" handle
    fn decide(&self, node: &GraphNode) -> bool;
}

impl<F> BranchDecider for F
where
    F: Fn(&GraphNode) -> bool + Send + Sync,
{
    fn decide(&self, node: &GraphNode) -> bool {
        self(node)
    }
}

/// Coin flip per condition node
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDecider;

impl BranchDecider for RandomDecider {
    fn decide(&self, _node: &GraphNode) -> bool {
        rand::random::<bool>()
    }
}

/// Always takes the same branch
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub bool);

impl BranchDecider for FixedDecider {
    fn decide(&self, _node: &GraphNode) -> bool {
        self.0
    }
}

/// Shared flag a caller sets to stop a run between steps
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Final state of one node in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutcome {
    pub status: NodeStatus,
    /// Branch token taken, for condition nodes that succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeOutcome {
    fn skipped() -> Self {
        Self {
            status: NodeStatus::Skipped,
            branch: None,
            error: None,
        }
    }
}

/// Non-fatal findings about a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionWarning {
    /// An edge closing a cycle was dropped from the order
    #[serde(rename_all = "camelCase")]
    CycleDetected {
        edge_id: String,
        source: NodeId,
        target: NodeId,
    },
    /// An edge references a node that does not exist
    #[serde(rename_all = "camelCase")]
    DanglingEdge { edge_id: String, node_id: NodeId },
    /// Several edges leave the same (source, handle) pair
    #[serde(rename_all = "camelCase")]
    BranchConflict { node_id: NodeId, handle: String },
    /// Two nodes share an id; only the first is executed
    #[serde(rename_all = "camelCase")]
    DuplicateNode { node_id: NodeId },
}

impl fmt::Display for ExecutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleDetected {
                edge_id,
                source,
                target,
            } => write!(
                f,
                "Cycle detected: edge '{}' ({} -> {}) was not followed",
                edge_id, source, target
            ),
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::BranchConflict { node_id, handle } => write!(
                f,
                "Node '{}' has more than one edge on handle '{}'",
                node_id, handle
            ),
            Self::DuplicateNode { node_id } => write!(f, "Duplicate node id '{}'", node_id),
        }
    }
}

impl From<GraphIssue> for ExecutionWarning {
    fn from(issue: GraphIssue) -> Self {
        match issue {
            GraphIssue::DanglingEdge { edge_id, node_id } => Self::DanglingEdge { edge_id, node_id },
            GraphIssue::BranchConflict { node_id, handle, .. } => Self::BranchConflict { node_id, handle },
            GraphIssue::DuplicateNodeId { node_id } => Self::DuplicateNode { node_id },
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution_id: String,
    /// Execution order that was used
    pub order: Vec<NodeId>,
    /// Final outcome of every ordered node
    pub outcomes: HashMap<NodeId, NodeOutcome>,
    pub warnings: Vec<ExecutionWarning>,
    /// Nodes no trigger reaches; never executed
    pub unreachable: Vec<NodeId>,
}

impl ExecutionReport {
    pub fn status(&self, node_id: &str) -> Option<NodeStatus> {
        self.outcomes.get(node_id).map(|o| o.status)
    }

    /// Branch token a condition node took
    pub fn branch(&self, node_id: &str) -> Option<&str> {
        self.outcomes.get(node_id).and_then(|o| o.branch.as_deref())
    }

    pub fn error(&self, node_id: &str) -> Option<&str> {
        self.outcomes.get(node_id).and_then(|o| o.error.as_deref())
    }

    /// Number of nodes that ended in `status`
    pub fn count(&self, status: NodeStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    /// Whether every ordered node reached a terminal status
    pub fn is_complete(&self) -> bool {
        self.order.iter().all(|id| {
            self.outcomes
                .get(id)
                .map(|o| o.status.is_terminal())
                .unwrap_or(false)
        })
    }
}

/// What a single step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub node_id: NodeId,
    pub outcome: NodeOutcome,
}

/// Executes workflow graphs as timed simulations
pub struct WorkflowSimulator {
    config: SimulationConfig,
    decider: Arc<dyn BranchDecider>,
}

impl WorkflowSimulator {
    /// Create a simulator with random condition outcomes
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            decider: Arc::new(RandomDecider),
        }
    }

    /// Replace the condition outcome source
    pub fn with_decider(mut self, decider: impl BranchDecider + 'static) -> Self {
        self.decider = Arc::new(decider);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Execution order of a graph, without running anything
    pub fn compute_order(&self, graph: &WorkflowGraph) -> ExecutionOrder {
        compute_order(graph)
    }

    /// Begin a stepwise run over a copy of `graph`
    pub fn start(&self, graph: &WorkflowGraph) -> SimulationRun {
        SimulationRun::new(graph.clone(), self.config.clone(), Arc::clone(&self.decider))
    }

    /// Run a graph to completion
    pub async fn run(&self, graph: &WorkflowGraph, sink: &dyn ProgressSink) -> ExecutionReport {
        let mut run = self.start(graph);
        while run.step(sink).await.is_some() {}
        run.finish()
    }

    /// Run a graph, checking `abort` before every step
    ///
    /// A step already in flight always completes; the run then stops and
    /// returns `EngineError::Cancelled`.
    pub async fn run_with_abort(
        &self,
        graph: &WorkflowGraph,
        sink: &dyn ProgressSink,
        abort: &AbortSignal,
    ) -> Result<ExecutionReport> {
        let mut run = self.start(graph);
        loop {
            if abort.is_aborted() {
                log::warn!("Workflow run {} cancelled", run.execution_id());
                return Err(EngineError::Cancelled);
            }
            if run.step(sink).await.is_none() {
                break;
            }
        }
        Ok(run.finish())
    }
}

impl Default for WorkflowSimulator {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

/// A run in progress over a private copy of the graph
pub struct SimulationRun {
    execution_id: String,
    graph: WorkflowGraph,
    order: ExecutionOrder,
    cursor: usize,
    /// Token emitted by each processed node; None if it failed or was skipped
    tokens: HashMap<NodeId, Option<String>>,
    /// Indices into `graph.edges`, keyed by target node
    incoming: HashMap<NodeId, Vec<usize>>,
    outcomes: HashMap<NodeId, NodeOutcome>,
    warnings: Vec<ExecutionWarning>,
    config: SimulationConfig,
    decider: Arc<dyn BranchDecider>,
}

impl SimulationRun {
    fn new(graph: WorkflowGraph, config: SimulationConfig, decider: Arc<dyn BranchDecider>) -> Self {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let order = compute_order(&graph);

        let mut incoming: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, edge) in graph.edges.iter().enumerate() {
            incoming.entry(edge.target.clone()).or_default().push(index);
        }

        let mut warnings: Vec<ExecutionWarning> = validate_structure(&graph)
            .into_iter()
            .map(ExecutionWarning::from)
            .collect();
        warnings.extend(order.dropped_edges.iter().map(|e| ExecutionWarning::CycleDetected {
            edge_id: e.edge_id.clone(),
            source: e.source.clone(),
            target: e.target.clone(),
        }));

        log::info!(
            "Starting workflow run {}: {} node(s) ordered, {} unreachable, {} warning(s)",
            execution_id,
            order.nodes.len(),
            order.unreachable.len(),
            warnings.len()
        );

        Self {
            execution_id,
            graph,
            order,
            cursor: 0,
            tokens: HashMap::new(),
            incoming,
            outcomes: HashMap::new(),
            warnings,
            config,
            decider,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The order this run follows
    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    /// Whether every ordered node has been processed
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.order.nodes.len()
    }

    /// Process the next node in the order
    ///
    /// Returns None once the order is exhausted.
    pub async fn step(&mut self, sink: &dyn ProgressSink) -> Option<StepRecord> {
        let node = self.order.nodes.get(self.cursor)?.clone();
        self.cursor += 1;

        if !self.is_reachable(&node.id) {
            log::debug!("Skipping unreachable node {} ({})", node.id, node.node_type);
            sink.on_progress(&node.id, NodeStatus::Skipped);
            return Some(self.record(&node.id, None, NodeOutcome::skipped()));
        }

        log::debug!("Executing node {} ({})", node.id, node.node_type);
        sink.on_progress(&node.id, NodeStatus::Running);

        let latency = self.draw_latency();
        if latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(latency).await;
        }

        match self.execute(&node) {
            Ok(token) => {
                let branch = node.node_type.is_condition().then(|| token.clone());
                sink.on_progress(&node.id, NodeStatus::Success);
                let outcome = NodeOutcome {
                    status: NodeStatus::Success,
                    branch,
                    error: None,
                };
                Some(self.record(&node.id, Some(token), outcome))
            }
            Err(e) => {
                log::warn!("Node {} failed: {}", node.id, e);
                sink.on_progress(&node.id, NodeStatus::Error);
                let outcome = NodeOutcome {
                    status: NodeStatus::Error,
                    branch: None,
                    error: Some(e.to_string()),
                };
                Some(self.record(&node.id, None, outcome))
            }
        }
    }

    /// Build the report for the nodes processed so far
    pub fn finish(self) -> ExecutionReport {
        let report = ExecutionReport {
            execution_id: self.execution_id,
            order: self.order.nodes.iter().map(|n| n.id.clone()).collect(),
            outcomes: self.outcomes,
            warnings: self.warnings,
            unreachable: self.order.unreachable,
        };
        log::info!(
            "Workflow run {} finished: {} succeeded, {} failed, {} skipped",
            report.execution_id,
            report.count(NodeStatus::Success),
            report.count(NodeStatus::Error),
            report.count(NodeStatus::Skipped)
        );
        report
    }

    fn is_reachable(&self, node_id: &str) -> bool {
        let Some(edge_indices) = self.incoming.get(node_id) else {
            return true;
        };
        let mut decided = edge_indices
            .iter()
            .map(|&i| &self.graph.edges[i])
            .filter_map(|edge| self.tokens.get(&edge.source).map(|token| (edge, token)))
            .peekable();

        if decided.peek().is_none() {
            return true;
        }

        decided.any(|(edge, token)| match token {
            Some(token) if token == DEFAULT_BRANCH => true,
            Some(token) => edge.source_handle.as_deref() == Some(token.as_str()),
            None => false,
        })
    }

    /// The node's own work, after the simulated latency
    fn execute(&self, node: &GraphNode) -> Result<String> {
        if node.node_type.is_action() {
            let configured = ACTION_TARGET_FIELDS
                .iter()
                .any(|field| node.data.config.get(*field).map(is_set).unwrap_or(false));
            if !configured {
                return Err(EngineError::missing_configuration(node.id.clone()));
            }
        }

        if node.node_type.is_condition() {
            let outcome = self.decider.decide(node);
            log::debug!("Condition {} evaluated to {}", node.id, outcome);
            return Ok(outcome.to_string());
        }

        Ok(DEFAULT_BRANCH.to_string())
    }

    fn draw_latency(&self) -> Duration {
        let jitter = if self.config.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.base_latency_ms.saturating_add(jitter))
    }

    fn record(&mut self, node_id: &str, token: Option<String>, outcome: NodeOutcome) -> StepRecord {
        self.tokens.insert(node_id.to_string(), token);
        self.outcomes.insert(node_id.to_string(), outcome.clone());
        StepRecord {
            node_id: node_id.to_string(),
            outcome,
        }
    }
}

/// Whether a config value counts as filled in
fn is_set(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
