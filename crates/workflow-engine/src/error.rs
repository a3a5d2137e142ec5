//! Error types for the workflow engine

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the workflow engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// An action node has none of the fields that name its target
    #[error("Missing configuration: node '{node_id}' has no url, to or phone set")]
    MissingConfiguration { node_id: NodeId },

    /// A second edge would leave the same (source, handle) pair
    #[error("Branch conflict: node '{node_id}' already has an edge on handle '{handle}'")]
    BranchConflict { node_id: NodeId, handle: String },

    /// A coordinate is NaN or infinite and cannot be snapshotted
    #[error("Non-finite coordinate in {location}")]
    NonFiniteCoordinate { location: String },

    /// The caller aborted the run between two steps
    #[error("Workflow run cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a missing configuration error for a node
    pub fn missing_configuration(node_id: impl Into<NodeId>) -> Self {
        Self::MissingConfiguration {
            node_id: node_id.into(),
        }
    }
}
