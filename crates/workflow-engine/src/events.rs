//! Progress reporting for workflow runs
//!
//! The executor reports every node status transition to a sink. Sinks are
//! called synchronously on the executor's turn, so they must return quickly.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{NodeId, NodeStatus};

/// Receives node status transitions during a run
///
/// Closures of the form `Fn(&str, NodeStatus)` are sinks too.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, node_id: &str, status: NodeStatus);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, NodeStatus) + Send + Sync,
{
    fn on_progress(&self, node_id: &str, status: NodeStatus) {
        self(node_id, status)
    }
}

/// A single status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub node_id: NodeId,
    pub status: NodeStatus,
}

impl ProgressEvent {
    pub fn new(node_id: impl Into<NodeId>, status: NodeStatus) -> Self {
        Self {
            node_id: node_id.into(),
            status,
        }
    }
}

/// A no-op sink that discards all transitions
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_progress(&self, _node_id: &str, _status: NodeStatus) {}
}

/// A vector-based sink that collects transitions
///
/// Useful for testing to verify transitions were emitted in order.
#[derive(Default)]
pub struct VecProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl VecProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected transitions
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Statuses reported for one node, in order
    pub fn statuses_for(&self, node_id: &str) -> Vec<NodeStatus> {
        self.events()
            .into_iter()
            .filter(|e| e.node_id == node_id)
            .map(|e| e.status)
            .collect()
    }

    /// Clear all collected transitions
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl ProgressSink for VecProgressSink {
    fn on_progress(&self, node_id: &str, status: NodeStatus) {
        if let Ok(mut events) = self.events.lock() {
            events.push(ProgressEvent::new(node_id, status));
        }
    }
}

/// Forwards transitions into an unbounded tokio channel
///
/// Lets a consumer on another task observe a run as a stream. Sends to a
/// closed channel are dropped.
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgressSink {
    /// Create a sink and the receiving half of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&self, node_id: &str, status: NodeStatus) {
        if self.tx.send(ProgressEvent::new(node_id, status)).is_err() {
            log::trace!("Progress receiver dropped; discarding {} -> {}", node_id, status);
        }
    }
}
