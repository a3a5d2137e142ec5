//! Workflow Engine - graph editing and simulated execution for workflows
//!
//! This crate holds the editable side of a workflow builder and a
//! simulated executor for the graphs it produces:
//!
//! - Typed workflow graphs (triggers, actions, branching logic)
//! - Graph editing with bounded, compressed snapshot undo/redo
//! - Best-effort persistence through a pluggable store
//! - Topological ordering with cycle truncation
//! - Sequential simulated execution with conditional branching and
//!   skip propagation
//!
//! # Architecture
//!
//! - `GraphManager`: owns the live graph; every structural edit goes
//!   through it and is snapshotted into `History`
//! - `WorkflowSimulator`: runs a copy of a graph and reports progress to a
//!   `ProgressSink`
//! - `WorkflowStore`, `IdGenerator`, `BranchDecider`: seams for the host
//!
//! # Example
//!
//! ```ignore
//! use workflow_engine::{GraphManager, NodeType, Position, SimulationConfig, WorkflowSimulator};
//!
//! let mut manager = GraphManager::new();
//! let trigger = manager.add_node(NodeType::TriggerManual, Position::new(0.0, 0.0))?;
//! let http = manager.add_node(NodeType::ActionHttp, Position::new(200.0, 0.0))?;
//! manager.connect(&trigger, &http, None)?;
//!
//! let simulator = WorkflowSimulator::new(SimulationConfig::default());
//! let report = simulator
//!     .run(manager.graph(), &|id: &str, status| println!("{id}: {status}"))
//!     .await;
//! manager.apply_report(&report);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod history;
pub mod ids;
pub mod manager;
pub mod scheduler;
pub mod simulator;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use config::{ConfigError, EngineConfig, HistoryConfig, SimulationConfig, StorageConfig};
pub use error::{EngineError, Result};
pub use events::{ChannelProgressSink, NullProgressSink, ProgressEvent, ProgressSink, VecProgressSink};
pub use history::History;
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
pub use manager::GraphManager;
pub use scheduler::{compute_order, DroppedEdge, ExecutionOrder};
pub use simulator::{
    AbortSignal, BranchDecider, ExecutionReport, ExecutionWarning, FixedDecider, NodeOutcome,
    RandomDecider, SimulationRun, StepRecord, WorkflowSimulator,
};
pub use store::{FileWorkflowStore, MemoryWorkflowStore, WorkflowStore};
pub use types::{
    EdgeId, GraphEdge, GraphNode, NodeConfig, NodeData, NodeDataPatch, NodeId, NodeStatus, NodeType,
    Position, Viewport, WorkflowGraph, DEFAULT_BRANCH,
};
pub use validation::{validate_node_config, validate_structure, FieldError, FieldErrorKind, GraphIssue};
