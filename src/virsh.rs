//! `virsh` command construction
//!
//! Each node is backed by a libvirt domain named after the OCP version
//! and the node name, e.g. `test-ocp4-14-worker-0`.

use std::fmt;

use crate::node::ZNode;

/// Builds `virsh` commands for node domains
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Virsh {
    prefix: String,
    version: String,
    sudo: bool,
}

impl Virsh {
    /// `ocp_version` is given dotted (`4.14`); dots become dashes in names
    pub fn new(prefix: impl Into<String>, ocp_version: &str) -> Self {
        Self {
            prefix: prefix.into(),
            version: ocp_version.replace('.', "-"),
            sudo: true,
        }
    }

    /// Toggle the `sudo` prefix on generated commands
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Domain backing `node`
    pub fn domain(&self, node: &ZNode) -> String {
        format!("{}{}-{}", self.prefix, self.version, node.name)
    }

    pub fn domstate(&self, node: &ZNode) -> String {
        self.command("domstate", node)
    }

    pub fn shutdown(&self, node: &ZNode) -> String {
        self.command("shutdown", node)
    }

    pub fn start(&self, node: &ZNode) -> String {
        self.command("start", node)
    }

    fn command(&self, verb: &str, node: &ZNode) -> String {
        let sudo = if self.sudo { "sudo " } else { "" };
        format!("{sudo}virsh {verb} {}", self.domain(node))
    }
}

/// State reported by `virsh domstate`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainState {
    Running,
    Idle,
    Paused,
    InShutdown,
    ShutOff,
    Crashed,
    PmSuspended,
    Unknown(String),
}

impl DomainState {
    /// Parse raw `domstate` stdout
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw).to_lowercase();
        match text.trim_end() {
            "running" => DomainState::Running,
            "idle" => DomainState::Idle,
            "paused" => DomainState::Paused,
            "in shutdown" => DomainState::InShutdown,
            "shut off" => DomainState::ShutOff,
            "crashed" => DomainState::Crashed,
            "pmsuspended" => DomainState::PmSuspended,
            other => DomainState::Unknown(other.to_string()),
        }
    }

    /// Only a running domain counts as up
    pub fn is_running(&self) -> bool {
        matches!(self, DomainState::Running)
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainState::Running => f.write_str("running"),
            DomainState::Idle => f.write_str("idle"),
            DomainState::Paused => f.write_str("paused"),
            DomainState::InShutdown => f.write_str("in shutdown"),
            DomainState::ShutOff => f.write_str("shut off"),
            DomainState::Crashed => f.write_str("crashed"),
            DomainState::PmSuspended => f.write_str("pmsuspended"),
            DomainState::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}
