//! Per-node service control
//!
//! Stops and starts a node-level service (kubelet by default) for
//! environments where nodes cannot be powered off through a hypervisor.

mod kubelet;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::node::ZNode;

pub use kubelet::KubeletService;

/// Stops and starts a node from the cluster's point of view
#[async_trait]
pub trait NodeService: Send + Sync {
    async fn stop(&self, node: &ZNode, timeout: Duration) -> Result<()>;

    async fn start(&self, node: &ZNode, timeout: Duration) -> Result<()>;
}
