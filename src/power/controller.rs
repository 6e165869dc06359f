//! Node power controller
//!
//! Stops, starts and restarts nodes either through `virsh` (KVM hosts) or
//! through the per-node service controller (everything else).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::fanout::for_each_node;
use super::report::{PowerAction, PowerMode, PowerReport};
use crate::cluster::ClusterReadiness;
use crate::config::{EnvData, PowerConfig};
use crate::error::PowerError;
use crate::exec::CommandRunner;
use crate::node::{NodeStatus, ZNode};
use crate::poll::TimeoutSampler;
use crate::service::NodeService;
use crate::utils::{Stopwatch, Timer};
use crate::virsh::{DomainState, Virsh};
use crate::virt::{LsmodProbe, VirtualizationProbe};

/// Power controller for a set of cluster nodes
pub struct ZNodes {
    runner: Arc<dyn CommandRunner>,
    service: Arc<dyn NodeService>,
    cluster: Arc<dyn ClusterReadiness>,
    virsh: Virsh,
    config: PowerConfig,
    is_kvm: bool,
}

/// Builder for [`ZNodes`]
pub struct ZNodesBuilder {
    runner: Arc<dyn CommandRunner>,
    service: Arc<dyn NodeService>,
    cluster: Arc<dyn ClusterReadiness>,
    probe: Option<Arc<dyn VirtualizationProbe>>,
    config: PowerConfig,
    env_data: EnvData,
}

impl ZNodesBuilder {
    pub fn config(mut self, config: PowerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn env_data(mut self, env_data: EnvData) -> Self {
        self.env_data = env_data;
        self
    }

    /// Replace the default `lsmod` probe
    pub fn probe(mut self, probe: Arc<dyn VirtualizationProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Detect the environment mode and build the controller
    pub async fn build(self) -> Result<ZNodes> {
        let probe: Arc<dyn VirtualizationProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(
                LsmodProbe::new(self.runner.clone())
                    .command(self.config.lsmod_command.clone())
                    .marker(self.config.kvm_marker.clone()),
            ),
        };

        let mut is_kvm = probe
            .is_virtualized()
            .await
            .with_context(|| format!("Virtualization probe '{}' failed", probe.name()))?;

        if self.env_data.has_bastion() {
            debug!("Bastion host configured, forcing generic mode");
            is_kvm = false;
        }

        info!("iskvm check: {}", is_kvm);

        let virsh = Virsh::new(
            self.config.domain_prefix.clone(),
            &self.config.ocp_version,
        )
        .sudo(self.config.use_sudo);

        Ok(ZNodes {
            runner: self.runner,
            service: self.service,
            cluster: self.cluster,
            virsh,
            config: self.config,
            is_kvm,
        })
    }
}

impl ZNodes {
    pub fn builder(
        runner: Arc<dyn CommandRunner>,
        service: Arc<dyn NodeService>,
        cluster: Arc<dyn ClusterReadiness>,
    ) -> ZNodesBuilder {
        ZNodesBuilder {
            runner,
            service,
            cluster,
            probe: None,
            config: PowerConfig::default(),
            env_data: EnvData::default(),
        }
    }

    /// Whether nodes are local libvirt/KVM domains
    pub fn is_environment_virtualized(&self) -> bool {
        self.is_kvm
    }

    pub fn mode(&self) -> PowerMode {
        PowerMode::from_flag(self.is_kvm)
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn virsh(&self) -> &Virsh {
        &self.virsh
    }

    /// Current state of the domain backing `node`
    pub async fn domain_state(&self, node: &ZNode) -> Result<DomainState> {
        let output = self.runner.run(&self.virsh.domstate(node)).await?;
        Ok(DomainState::parse(&output.stdout))
    }

    /// True unless the node's domain reports `running`
    pub async fn is_node_down(&self, node: &ZNode) -> Result<bool> {
        let state = self.domain_state(node).await?;
        debug!("Domain {} state: {}", self.virsh.domain(node), state);
        Ok(!state.is_running())
    }

    /// Stop nodes through the service controller, then wait for pods to drain.
    ///
    /// `wait` and `force` are accepted for API symmetry and currently unused.
    pub async fn stop_nodes(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        _wait: bool,
        _force: bool,
    ) -> Result<()> {
        for_each_node(nodes, self.config.max_concurrent, |node| {
            self.service.stop(node, timeout)
        })
        .await?;

        let grace = self.config.grace_period();
        info!("Waiting for {} seconds", grace.as_secs());
        sleep(grace).await;

        Ok(())
    }

    /// Shut down node domains and wait until each reports down.
    ///
    /// Fails with [`PowerError::NodeStillRunning`] when a domain is still
    /// running after `timeout`.
    pub async fn stop_nodes_virtualized(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        _wait: bool,
        _force: bool,
    ) -> Result<()> {
        let sampler = TimeoutSampler::new(timeout).interval(self.config.poll_interval());

        for_each_node(nodes, self.config.max_concurrent, |node| async move {
            let output = self.runner.run(&self.virsh.shutdown(node)).await?;
            info!(
                "Result of shutdown {}: {}",
                node.name,
                output.stdout_str().trim()
            );

            info!("Verifying node {} is down", node.name);
            let down = sampler
                .wait_for_func_status(move || self.is_node_down(node), true)
                .await;

            if !down {
                warn!("Node {} did not shut down within {:?}", node.name, timeout);
                return Err(PowerError::NodeStillRunning {
                    node: node.name.clone(),
                }
                .into());
            }

            Ok(())
        })
        .await
    }

    /// Start nodes through the service controller
    pub async fn start_nodes(&self, nodes: &[ZNode], timeout: Duration, _wait: bool) -> Result<()> {
        for_each_node(nodes, self.config.max_concurrent, |node| {
            self.service.start(node, timeout)
        })
        .await
    }

    /// Start node domains, then wait for the cluster and every master and
    /// worker node to become ready
    pub async fn start_nodes_virtualized(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        _wait: bool,
        _force: bool,
    ) -> Result<()> {
        for_each_node(nodes, self.config.max_concurrent, |node| async move {
            let output = self.runner.run(&self.virsh.start(node)).await?;
            info!("Result of start {}: {}", node.name, output.stdout_str().trim());
            Ok(())
        })
        .await?;

        self.cluster
            .wait_for_cluster_connectivity(self.config.connectivity_tries)
            .await?;

        let masters = self.cluster.list_master_nodes().await?;
        self.cluster
            .wait_for_nodes_status(&masters, NodeStatus::Ready, timeout)
            .await?;

        let workers = self.cluster.list_worker_nodes().await?;
        self.cluster
            .wait_for_nodes_status(&workers, NodeStatus::Ready, timeout)
            .await
    }

    /// Stop then start nodes through the service controller
    pub async fn restart_nodes(&self, nodes: &[ZNode], timeout: Duration, wait: bool) -> Result<()> {
        let mut stopwatch = Stopwatch::new();
        self.stop_nodes(nodes, timeout, wait, true).await?;
        stopwatch.lap("stop");
        self.start_nodes(nodes, timeout, wait).await?;
        stopwatch.lap("start");
        debug!("Restart timings:\n{}", stopwatch.format());
        Ok(())
    }

    /// Stop then start node domains; no node starts before all have stopped
    pub async fn restart_nodes_virtualized(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        wait: bool,
        force: bool,
    ) -> Result<()> {
        let mut stopwatch = Stopwatch::new();
        self.stop_nodes_virtualized(nodes, timeout, wait, force)
            .await?;
        stopwatch.lap("stop");
        self.start_nodes_virtualized(nodes, timeout, wait, force)
            .await?;
        stopwatch.lap("start");
        debug!("Restart timings:\n{}", stopwatch.format());
        Ok(())
    }

    /// Stop nodes using the variant matching the environment
    pub async fn stop(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        wait: bool,
        force: bool,
    ) -> Result<PowerReport> {
        self.dispatch(PowerAction::Stop, nodes, async {
            if self.is_kvm {
                self.stop_nodes_virtualized(nodes, timeout, wait, force).await
            } else {
                self.stop_nodes(nodes, timeout, wait, force).await
            }
        })
        .await
    }

    /// Start nodes using the variant matching the environment
    pub async fn start(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        wait: bool,
        force: bool,
    ) -> Result<PowerReport> {
        self.dispatch(PowerAction::Start, nodes, async {
            if self.is_kvm {
                self.start_nodes_virtualized(nodes, timeout, wait, force).await
            } else {
                self.start_nodes(nodes, timeout, wait).await
            }
        })
        .await
    }

    /// Restart nodes using the variant matching the environment
    pub async fn restart(
        &self,
        nodes: &[ZNode],
        timeout: Duration,
        wait: bool,
        force: bool,
    ) -> Result<PowerReport> {
        self.dispatch(PowerAction::Restart, nodes, async {
            if self.is_kvm {
                self.restart_nodes_virtualized(nodes, timeout, wait, force)
                    .await
            } else {
                self.restart_nodes(nodes, timeout, wait).await
            }
        })
        .await
    }

    async fn dispatch(
        &self,
        action: PowerAction,
        nodes: &[ZNode],
        op: impl std::future::Future<Output = Result<()>>,
    ) -> Result<PowerReport> {
        let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
        let mode = self.mode();
        info!(
            "Running {} ({}) on {} node(s): {}",
            action,
            mode,
            names.len(),
            names.join(", ")
        );

        let started_at = Utc::now();
        let timer = Timer::start(format!("{action} {}", names.join(",")));

        op.await
            .with_context(|| format!("Failed to {action} nodes [{}]", names.join(", ")))?;

        let elapsed = timer.stop();
        Ok(PowerReport::new(
            action,
            mode,
            names,
            started_at,
            elapsed,
        ))
    }
}
