//! Core types for workflow graphs
//!
//! These types define the structure of a workflow graph: typed nodes,
//! edges with optional branch handles, and the editor viewport. The JSON
//! shape matches what the editor produces, so graphs round-trip through
//! the persistence store unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Opaque per-node configuration, keyed by field name
pub type NodeConfig = serde_json::Map<String, serde_json::Value>;

/// Branch token emitted by every node that is not a condition
pub const DEFAULT_BRANCH: &str = "default";

/// The closed set of node types the editor can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    TriggerManual,
    TriggerWebhook,
    ActionHttp,
    ActionEmail,
    ActionSms,
    LogicCondition,
    LogicTransform,
}

impl NodeType {
    /// Every node type, in palette order
    pub const ALL: [NodeType; 7] = [
        NodeType::TriggerManual,
        NodeType::TriggerWebhook,
        NodeType::ActionHttp,
        NodeType::ActionEmail,
        NodeType::ActionSms,
        NodeType::LogicCondition,
        NodeType::LogicTransform,
    ];

    /// Wire name of the type (e.g. "action_http")
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::TriggerManual => "trigger_manual",
            NodeType::TriggerWebhook => "trigger_webhook",
            NodeType::ActionHttp => "action_http",
            NodeType::ActionEmail => "action_email",
            NodeType::ActionSms => "action_sms",
            NodeType::LogicCondition => "logic_condition",
            NodeType::LogicTransform => "logic_transform",
        }
    }

    /// Trigger nodes seed the topological traversal
    pub fn is_trigger(&self) -> bool {
        self.as_str().starts_with("trigger")
    }

    /// Action nodes must name a target before they can run
    pub fn is_action(&self) -> bool {
        self.as_str().starts_with("action")
    }

    pub fn is_condition(&self) -> bool {
        matches!(self, NodeType::LogicCondition)
    }

    /// Label given to freshly placed nodes: the last segment of the
    /// type name, upper-cased ("action_http" -> "HTTP")
    pub fn default_label(&self) -> String {
        self.as_str()
            .rsplit('_')
            .next()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "New Node".to_string())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown node type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeType(pub String);

impl fmt::Display for UnknownNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown node type '{}'", self.0)
    }
}

impl std::error::Error for UnknownNodeType {}

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}

/// Execution status of a node, as shown in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
    Skipped,
}

impl NodeStatus {
    /// Whether a run is finished with this node
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Success | NodeStatus::Error | NodeStatus::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Idle => "idle",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
            NodeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite (JSON cannot carry NaN or infinity)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pan/zoom state of the editor canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.zoom.is_finite()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Per-node payload: display label, configuration and run status
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default)]
    pub status: NodeStatus,
    /// Set only while `status` is `Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial update applied by `GraphManager::update_node_data`
///
/// `config`, when present, replaces the whole configuration object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDataPatch {
    pub label: Option<String>,
    pub config: Option<NodeConfig>,
    pub status: Option<NodeStatus>,
    pub error: Option<String>,
}

impl NodeDataPatch {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl GraphNode {
    /// Create an idle node with the type's default label and an empty config
    pub fn new(id: impl Into<NodeId>, node_type: NodeType, position: Position) -> Self {
        Self {
            id: id.into(),
            node_type,
            position,
            data: NodeData {
                label: node_type.default_label(),
                config: NodeConfig::new(),
                status: NodeStatus::Idle,
                error: None,
            },
            selected: false,
        }
    }

    /// Replace the configuration (builder style)
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.data.config = config;
        self
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Branch label on the source side ("true", "false", "default")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        source_handle: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle,
            selected: false,
        }
    }

    /// Whether this edge touches the given node on either end
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A complete workflow graph
///
/// This is also the unit of history: every undo/redo snapshot is a full
/// copy of this value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub viewport: Viewport,
}

impl WorkflowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Find an edge by ID
    pub fn find_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Get edges coming into a node
    ///
    /// The yielded edges borrow the graph only, not `node_id`.
    pub fn incoming_edges<'a, 'n>(&'a self, node_id: &'n str) -> impl Iterator<Item = &'a GraphEdge> + 'n
    where
        'a: 'n,
    {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    ///
    /// The yielded edges borrow the graph only, not `node_id`.
    pub fn outgoing_edges<'a, 'n>(&'a self, node_id: &'n str) -> impl Iterator<Item = &'a GraphEdge> + 'n
    where
        'a: 'n,
    {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .map(|e| e.source.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node (downstream nodes)
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_edges(node_id)
            .map(|e| e.target.clone())
            .collect()
    }

    /// First coordinate that could not survive a JSON round trip
    ///
    /// Returns a description such as `"node 'n1' position"` or `"viewport"`.
    pub fn non_finite_coordinate(&self) -> Option<String> {
        if !self.viewport.is_finite() {
            return Some("viewport".to_string());
        }
        self.nodes
            .iter()
            .find(|n| !n.position.is_finite())
            .map(|n| format!("node '{}' position", n.id))
    }

    /// Trigger nodes, in insertion order
    pub fn triggers(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.node_type.is_trigger())
    }
}
