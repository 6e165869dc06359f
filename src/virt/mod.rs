//! Virtualization capability detection
//!
//! Decides whether nodes are local libvirt/KVM domains. Alternate
//! hypervisor backends plug in by implementing [`VirtualizationProbe`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::exec::CommandRunner;

/// Default command listing loaded kernel modules
pub const LSMOD_COMMAND: &str = "sudo /usr/sbin/lsmod";

/// Module name marking a KVM host
pub const KVM_MARKER: &str = "kvm";

/// Detects whether the local host runs nodes as virtual machines
#[async_trait]
pub trait VirtualizationProbe: Send + Sync {
    async fn is_virtualized(&self) -> Result<bool>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Looks for a kernel module in `lsmod` output
pub struct LsmodProbe {
    runner: Arc<dyn CommandRunner>,
    command: String,
    marker: String,
}

impl LsmodProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            command: LSMOD_COMMAND.to_string(),
            marker: KVM_MARKER.to_string(),
        }
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Module name to look for, matched case-insensitively
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into().to_lowercase();
        self
    }
}

#[async_trait]
impl VirtualizationProbe for LsmodProbe {
    async fn is_virtualized(&self) -> Result<bool> {
        let output = self.runner.run(&self.command).await?;
        let found = output.stdout_str().to_lowercase().contains(&self.marker);
        debug!("Module marker '{}' present: {}", self.marker, found);
        Ok(found)
    }

    fn name(&self) -> &str {
        "lsmod"
    }
}

/// Fixed answer, for hosts where probing is not possible
#[derive(Clone, Copy, Debug)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl VirtualizationProbe for StaticProbe {
    async fn is_virtualized(&self) -> Result<bool> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[tokio::test]
    async fn test_detects_kvm_any_case() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond(LSMOD_COMMAND, b"Module  Size  Used by\nKVM_intel 1234 0\n");

        let probe = LsmodProbe::new(runner.clone());
        assert!(probe.is_virtualized().await.unwrap());
        assert_eq!(runner.calls(), vec![LSMOD_COMMAND.to_string()]);
    }

    #[tokio::test]
    async fn test_no_kvm_module() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond(LSMOD_COMMAND, b"Module  Size  Used by\nxfs 1234 2\n");

        let probe = LsmodProbe::new(runner);
        assert!(!probe.is_virtualized().await.unwrap());
    }

    #[tokio::test]
    async fn test_command_failure_propagates() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail("lsmod", 127);

        let probe = LsmodProbe::new(runner).command("lsmod");
        assert!(probe.is_virtualized().await.is_err());
    }

    #[tokio::test]
    async fn test_custom_marker() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.respond(LSMOD_COMMAND, b"xen_netfront 1 0\n");

        let probe = LsmodProbe::new(runner).marker("XEN");
        assert!(probe.is_virtualized().await.unwrap());
    }
}
