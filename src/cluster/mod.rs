//! Cluster readiness
//!
//! Waits for the API server and for nodes to reach a given status.

mod kube_cluster;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::node::NodeStatus;

pub use kube_cluster::KubeCluster;

/// Readiness queries against the cluster the nodes belong to
#[async_trait]
pub trait ClusterReadiness: Send + Sync {
    /// Block until the API server answers, trying at most `tries` times
    async fn wait_for_cluster_connectivity(&self, tries: u32) -> Result<()>;

    /// Block until every named node reports `status`
    async fn wait_for_nodes_status(
        &self,
        node_names: &[String],
        status: NodeStatus,
        timeout: Duration,
    ) -> Result<()>;

    async fn list_master_nodes(&self) -> Result<Vec<String>>;

    async fn list_worker_nodes(&self) -> Result<Vec<String>>;
}
