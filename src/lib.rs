//! znodes - power control for virtual OpenShift test nodes
//!
//! Stops, starts and restarts cluster nodes for disruption tests. On KVM
//! hosts nodes are libvirt domains driven through `virsh`; elsewhere the
//! kubelet service on each node is stopped and started instead.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use znodes::{KubeCluster, KubeletService, ShellRunner, ZNode, ZNodes};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let runner = Arc::new(ShellRunner::new());
//! let cluster = Arc::new(KubeCluster::new());
//! let service = Arc::new(KubeletService::new(runner.clone(), cluster.clone()));
//!
//! let znodes = ZNodes::builder(runner, service, cluster).build().await?;
//! let nodes = vec![ZNode::new("worker-0"), ZNode::new("worker-1")];
//!
//! if znodes.is_environment_virtualized() {
//!     znodes
//!         .restart_nodes_virtualized(&nodes, Duration::from_secs(900), true, true)
//!         .await?;
//! } else {
//!     znodes
//!         .restart_nodes(&nodes, Duration::from_secs(900), true)
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod exec;
pub mod node;
pub mod poll;
pub mod power;
pub mod service;
pub mod utils;
pub mod virsh;
pub mod virt;

#[cfg(test)]
mod testing;

pub use cluster::{ClusterReadiness, KubeCluster};
pub use config::{AppConfig, EnvData, PowerConfig};
pub use error::PowerError;
pub use exec::{CommandOutput, CommandRunner, ShellRunner};
pub use node::{NodeStatus, ZNode};
pub use poll::TimeoutSampler;
pub use power::{PowerAction, PowerMode, PowerReport, ZNodes, ZNodesBuilder};
pub use service::{KubeletService, NodeService};
pub use virsh::{DomainState, Virsh};
pub use virt::{LsmodProbe, StaticProbe, VirtualizationProbe};
