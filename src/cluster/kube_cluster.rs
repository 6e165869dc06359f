//! Kubernetes API backed readiness checks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::{
    api::{Api, ListParams},
    Client,
};
use tokio::sync::{Mutex, OnceCell};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::ClusterReadiness;
use crate::error::PowerError;
use crate::node::{NodeStatus, MASTER_LABEL, WORKER_LABEL};
use crate::poll::TimeoutSampler;

/// Readiness checks through the Kubernetes API
///
/// The client is created on first use, so commands that never touch the
/// cluster work without a kubeconfig.
#[derive(Clone)]
pub struct KubeCluster {
    client: Arc<OnceCell<Client>>,
    poll_interval: Duration,
}

impl KubeCluster {
    /// Use the default kubeconfig / in-cluster config
    pub fn new() -> Self {
        Self {
            client: Arc::new(OnceCell::new()),
            poll_interval: Duration::from_secs(3),
        }
    }

    /// Delay between API polls
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn client(&self) -> Result<Client> {
        let client = self
            .client
            .get_or_try_init(|| async {
                Client::try_default()
                    .await
                    .context("Failed to create Kubernetes client")
            })
            .await?;

        Ok(client.clone())
    }

    async fn nodes(&self) -> Result<Api<Node>> {
        Ok(Api::all(self.client().await?))
    }

    async fn list_by_label(&self, label: &str) -> Result<Vec<String>> {
        let nodes = self
            .nodes()
            .await?
            .list(&ListParams::default().labels(label))
            .await
            .with_context(|| format!("Failed to list nodes with label {label}"))?;

        Ok(nodes
            .items
            .iter()
            .filter_map(|n| n.metadata.name.clone())
            .collect())
    }
}

impl Default for KubeCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Names from `wanted` whose node is missing or not in `status`
pub(crate) fn pending_nodes(items: &[Node], wanted: &[String], status: NodeStatus) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| {
            items
                .iter()
                .find(|n| n.metadata.name.as_deref() == Some(name.as_str()))
                .map(|n| !status.satisfied_by(NodeStatus::of(n)))
                .unwrap_or(true)
        })
        .cloned()
        .collect()
}

/// Sample `list_nodes` until every name in `node_names` is in `status`.
///
/// On timeout the error names only the nodes still pending at the last
/// successful listing.
pub(crate) async fn wait_for_listed_status<F, Fut>(
    mut list_nodes: F,
    node_names: &[String],
    status: NodeStatus,
    sampler: TimeoutSampler,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Node>>>,
{
    if node_names.is_empty() {
        return Ok(());
    }

    info!(
        "Waiting for nodes [{}] to reach status {}",
        node_names.join(", "),
        status
    );

    let pending = Mutex::new(node_names.to_vec());

    let reached = sampler
        .wait_for_func_status(
            || {
                let listing = list_nodes();
                let pending = &pending;
                async move {
                    let items = listing.await?;
                    let still = pending_nodes(&items, node_names, status);
                    debug!("Nodes not yet {}: {:?}", status, still);
                    let done = still.is_empty();
                    *pending.lock().await = still;
                    Ok(done)
                }
            },
            true,
        )
        .await;

    if reached {
        info!("Nodes [{}] reached status {}", node_names.join(", "), status);
        return Ok(());
    }

    let still = pending.into_inner();
    Err(PowerError::NodeStatusTimeout {
        nodes: still,
        status: status.to_string(),
        timeout_secs: sampler.timeout().as_secs(),
    }
    .into())
}

#[async_trait]
impl ClusterReadiness for KubeCluster {
    async fn wait_for_cluster_connectivity(&self, tries: u32) -> Result<()> {
        let client = self.client().await?;

        for attempt in 1..=tries {
            match client.apiserver_version().await {
                Ok(version) => {
                    info!(
                        "Cluster is reachable (server {}.{})",
                        version.major, version.minor
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!("Cluster not reachable (attempt {}/{}): {}", attempt, tries, e);
                }
            }

            if attempt < tries {
                sleep(self.poll_interval).await;
            }
        }

        warn!("Cluster is not reachable after {} tries", tries);
        Err(PowerError::ClusterUnreachable { tries }.into())
    }

    async fn wait_for_nodes_status(
        &self,
        node_names: &[String],
        status: NodeStatus,
        timeout: Duration,
    ) -> Result<()> {
        if node_names.is_empty() {
            return Ok(());
        }

        let api = self.nodes().await?;
        let api = &api;
        let sampler = TimeoutSampler::new(timeout).interval(self.poll_interval);

        wait_for_listed_status(
            move || async move {
                let list = api
                    .list(&ListParams::default())
                    .await
                    .context("Failed to list nodes")?;
                Ok(list.items)
            },
            node_names,
            status,
            sampler,
        )
        .await
    }

    async fn list_master_nodes(&self) -> Result<Vec<String>> {
        self.list_by_label(MASTER_LABEL).await
    }

    async fn list_worker_nodes(&self) -> Result<Vec<String>> {
        self.list_by_label(WORKER_LABEL).await
    }
}
