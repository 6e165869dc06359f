//! Node handles and statuses

use std::fmt;

use k8s_openapi::api::core::v1::Node;
use serde::{Deserialize, Serialize};

/// Label marking control-plane nodes
pub const MASTER_LABEL: &str = "node-role.kubernetes.io/master";

/// Label marking worker nodes
pub const WORKER_LABEL: &str = "node-role.kubernetes.io/worker";

/// Handle to a cluster node backed by a hypervisor domain
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZNode {
    pub name: String,
}

impl ZNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for ZNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Node status as reported by `oc get nodes`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
    SchedulingDisabled,
    Unknown,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Ready => "Ready",
            NodeStatus::NotReady => "NotReady",
            NodeStatus::SchedulingDisabled => "SchedulingDisabled",
            NodeStatus::Unknown => "Unknown",
        }
    }

    /// Derive the status of a Kubernetes `Node` from its conditions
    pub fn of(node: &Node) -> Self {
        let ready = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"));

        let unschedulable = node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);

        match ready.map(|c| c.status.as_str()) {
            Some("True") if unschedulable => NodeStatus::SchedulingDisabled,
            Some("True") => NodeStatus::Ready,
            Some("False") => NodeStatus::NotReady,
            // kubelet stopped posting status
            Some(_) => NodeStatus::NotReady,
            None => NodeStatus::Unknown,
        }
    }

    /// Whether an observed status satisfies this wanted status
    pub fn satisfied_by(&self, observed: NodeStatus) -> bool {
        match self {
            // A node that never reported is not ready either
            NodeStatus::NotReady => {
                matches!(observed, NodeStatus::NotReady | NodeStatus::Unknown)
            }
            wanted => *wanted == observed,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
