//! kubelet control through `oc debug`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::NodeService;
use crate::cluster::ClusterReadiness;
use crate::exec::CommandRunner;
use crate::node::{NodeStatus, ZNode};

/// systemd unit controlled on each node
pub const KUBELET_UNIT: &str = "kubelet.service";

/// Stops/starts kubelet on a node and waits for the node status to follow
pub struct KubeletService {
    runner: Arc<dyn CommandRunner>,
    cluster: Arc<dyn ClusterReadiness>,
}

impl KubeletService {
    pub fn new(runner: Arc<dyn CommandRunner>, cluster: Arc<dyn ClusterReadiness>) -> Self {
        Self { runner, cluster }
    }

    fn command(&self, node: &ZNode, action: &str) -> String {
        format!(
            "oc debug nodes/{} -- chroot /host systemctl {} {}",
            node.name, action, KUBELET_UNIT
        )
    }

    async fn act(
        &self,
        node: &ZNode,
        action: &str,
        expected: NodeStatus,
        timeout: Duration,
    ) -> Result<()> {
        info!("Running systemctl {} {} on node {}", action, KUBELET_UNIT, node.name);

        self.runner
            .run(&self.command(node, action))
            .await
            .with_context(|| format!("Failed to {action} {KUBELET_UNIT} on {}", node.name))?;

        self.cluster
            .wait_for_nodes_status(std::slice::from_ref(&node.name), expected, timeout)
            .await
    }
}

#[async_trait]
impl NodeService for KubeletService {
    async fn stop(&self, node: &ZNode, timeout: Duration) -> Result<()> {
        self.act(node, "stop", NodeStatus::NotReady, timeout).await
    }

    async fn start(&self, node: &ZNode, timeout: Duration) -> Result<()> {
        self.act(node, "start", NodeStatus::Ready, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PowerError;
    use crate::testing::{EventLog, FakeCluster, ScriptedRunner};

    fn service(log: &EventLog) -> (Arc<ScriptedRunner>, KubeletService) {
        let runner = Arc::new(ScriptedRunner::with_log(log.clone()));
        let cluster = Arc::new(FakeCluster::new(log.clone(), &[], &[]));
        let service = KubeletService::new(runner.clone(), cluster);
        (runner, service)
    }

    #[tokio::test]
    async fn test_stop_waits_for_not_ready() {
        let log = EventLog::default();
        let (_, service) = service(&log);

        service
            .stop(&ZNode::new("worker-0"), Duration::from_secs(300))
            .await
            .unwrap();

        assert_eq!(
            log.events(),
            vec![
                "run:oc debug nodes/worker-0 -- chroot /host systemctl stop kubelet.service"
                    .to_string(),
                "wait:NotReady:worker-0:300".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_start_waits_for_ready() {
        let log = EventLog::default();
        let (_, service) = service(&log);

        service
            .start(&ZNode::new("worker-1"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(log.events()[1], "wait:Ready:worker-1:60");
    }

    #[tokio::test]
    async fn test_command_failure_skips_wait() {
        let log = EventLog::default();
        let (runner, service) = service(&log);
        runner.fail(
            "oc debug nodes/worker-0 -- chroot /host systemctl stop kubelet.service",
            1,
        );

        let err = service
            .stop(&ZNode::new("worker-0"), Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(
            PowerError::find(&err),
            Some(PowerError::CommandFailed { .. })
        ));
        assert_eq!(log.events().len(), 1);
    }
}
