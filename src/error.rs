//! Error types for node power operations
//!
//! Most functions return `anyhow::Result`; the variants here are the
//! failures callers are expected to branch on via `downcast_ref`.

use thiserror::Error;

/// Domain errors raised while driving node power state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowerError {
    #[error("Command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Node {node} is still Running")]
    NodeStillRunning { node: String },

    #[error("Nodes [{}] did not reach status {status} within {timeout_secs} seconds", nodes.join(", "))]
    NodeStatusTimeout {
        nodes: Vec<String>,
        status: String,
        timeout_secs: u64,
    },

    #[error("Cluster is not reachable after {tries} tries")]
    ClusterUnreachable { tries: u32 },
}

impl PowerError {
    /// Find a `PowerError` anywhere in an `anyhow` error chain
    pub fn find(err: &anyhow::Error) -> Option<&PowerError> {
        err.chain().find_map(|e| e.downcast_ref::<PowerError>())
    }
}
