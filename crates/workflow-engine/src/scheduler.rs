//! Execution ordering
//!
//! Depth-first post-order topological sort seeded from trigger nodes.
//! Every node is placed after all nodes that lead to it, except across a
//! cycle: an edge that reaches a node still on the traversal stack is
//! dropped from the ordering and reported. Nodes that no trigger reaches
//! are left out of the order entirely.
//!
//! Triggers and each node's out-edges are walked in reverse insertion
//! order, so siblings come out in the order they were added.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, GraphEdge, GraphNode, NodeId, WorkflowGraph};

/// An edge left out of the ordering because it closes a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedEdge {
    pub edge_id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Result of ordering a graph for execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionOrder {
    /// Nodes to execute, in order
    pub nodes: Vec<GraphNode>,
    /// Back edges found while ordering
    pub dropped_edges: Vec<DroppedEdge>,
    /// Nodes with no path from any trigger, in insertion order
    pub unreachable: Vec<NodeId>,
}

impl ExecutionOrder {
    /// IDs of the ordered nodes
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Position of a node in the order
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == node_id)
    }

    pub fn has_cycles(&self) -> bool {
        !self.dropped_edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the traversal stack
    InProgress,
    /// Finished and placed in the order
    Done,
}

struct Frame<'a> {
    id: &'a str,
    /// Out-edges not yet followed; consumed from the back
    remaining: usize,
}

/// Compute the execution order of a graph
pub fn compute_order(graph: &WorkflowGraph) -> ExecutionOrder {
    let mut nodes_by_id: HashMap<&str, &GraphNode> = HashMap::new();
    for node in &graph.nodes {
        nodes_by_id.entry(node.id.as_str()).or_insert(node);
    }

    let mut adjacency: HashMap<&str, Vec<&GraphEdge>> = HashMap::new();
    for edge in &graph.edges {
        adjacency.entry(edge.source.as_str()).or_default().push(edge);
    }
    let no_edges: Vec<&GraphEdge> = Vec::new();
    let out_edges = |id: &str| adjacency.get(id).unwrap_or(&no_edges);

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut finished: Vec<&str> = Vec::new();
    let mut dropped_edges = Vec::new();

    let triggers: Vec<&GraphNode> = graph.triggers().collect();
    for trigger in triggers.into_iter().rev() {
        let root = trigger.id.as_str();
        if marks.contains_key(root) {
            continue;
        }

        marks.insert(root, Mark::InProgress);
        let mut stack = vec![Frame {
            id: root,
            remaining: out_edges(root).len(),
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.remaining == 0 {
                marks.insert(frame.id, Mark::Done);
                finished.push(frame.id);
                stack.pop();
                continue;
            }

            frame.remaining -= 1;
            let edge = out_edges(frame.id)[frame.remaining];
            let target = edge.target.as_str();
            if !nodes_by_id.contains_key(target) {
                log::debug!("Edge '{}' points at unknown node '{}'; ignored", edge.id, target);
                continue;
            }

            match marks.get(target).copied() {
                Some(Mark::InProgress) => {
                    log::warn!(
                        "Cycle detected: edge '{}' ({} -> {}) dropped from execution order",
                        edge.id,
                        edge.source,
                        edge.target
                    );
                    dropped_edges.push(DroppedEdge {
                        edge_id: edge.id.clone(),
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                    });
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target, Mark::InProgress);
                    stack.push(Frame {
                        id: target,
                        remaining: out_edges(target).len(),
                    });
                }
            }
        }
    }

    // Prepending each finished node is the same as reversing the post-order
    let nodes: Vec<GraphNode> = finished
        .iter()
        .rev()
        .filter_map(|id| nodes_by_id.get(id).map(|n| (*n).clone()))
        .collect();

    let unreachable: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| !marks.contains_key(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    if !unreachable.is_empty() {
        log::debug!("{} node(s) unreachable from any trigger", unreachable.len());
    }

    ExecutionOrder {
        nodes,
        dropped_edges,
        unreachable,
    }
}
