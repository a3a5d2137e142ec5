//! Engine-wide constants
//!
//! Single source of truth for the defaults used by configuration,
//! history and the simulated executor.

/// Default values for engine configuration
pub mod defaults {
    /// Number of pre-mutation snapshots kept for undo
    pub const HISTORY_LIMIT: usize = 50;
    /// Fixed part of the simulated per-node latency
    pub const BASE_LATENCY_MS: u64 = 800;
    /// Upper bound of the uniform jitter added to the base latency
    pub const JITTER_MS: u64 = 500;
    /// zstd level used for history snapshots
    pub const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;
}

/// Storage keys and file names
pub mod storage {
    /// Logical key of the single stored workflow
    pub const WORKFLOW_FILE: &str = "workflow_builder_data.json";
    /// Engine configuration file inside the data directory
    pub const CONFIG_FILE: &str = "config.json";
}

/// Config fields that name an action's target; one per action type
pub const ACTION_TARGET_FIELDS: [&str; 3] = ["url", "to", "phone"];
