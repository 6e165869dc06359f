//! Scripted collaborators for unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::cluster::ClusterReadiness;
use crate::error::PowerError;
use crate::exec::{CommandOutput, CommandRunner};
use crate::node::{NodeStatus, ZNode};
use crate::service::NodeService;

/// Ordered record of every collaborator call, shared between fakes
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Command runner returning canned output per command string.
///
/// Each command has a queue of responses; the last one repeats. Unscripted
/// commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, i32>>>>,
    calls: Mutex<Vec<String>>,
    log: EventLog,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn respond(&self, cmd: &str, stdout: &[u8]) {
        self.push(cmd, Ok(stdout.to_vec()));
    }

    pub fn fail(&self, cmd: &str, exit_code: i32) {
        self.push(cmd, Err(exit_code));
    }

    /// Replace every queued response for `cmd` with a single one
    pub fn set(&self, cmd: &str, stdout: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(cmd.to_string(), VecDeque::from([Ok(stdout.to_vec())]));
    }

    fn push(&self, cmd: &str, response: Result<Vec<u8>, i32>) {
        self.responses
            .lock()
            .unwrap()
            .entry(cmd.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, cmd: &str) -> usize {
        self.calls().iter().filter(|c| *c == cmd).count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, cmd: &str) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(cmd.to_string());
        self.log.push(format!("run:{cmd}"));

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(cmd) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            None => Ok(CommandOutput::default()),
            Some(Ok(stdout)) => Ok(CommandOutput::with_stdout(stdout)),
            Some(Err(exit_code)) => Err(PowerError::CommandFailed {
                command: cmd.to_string(),
                exit_code,
                stderr: "scripted failure".to_string(),
            }
            .into()),
        }
    }
}

/// Service controller that records calls
#[derive(Default)]
pub struct RecordingService {
    log: EventLog,
    failing: Mutex<HashSet<String>>,
    delay: Duration,
}

impl RecordingService {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Sleep this long inside every call
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_on(&self, node: &str) {
        self.failing.lock().unwrap().insert(node.to_string());
    }

    async fn call(&self, action: &str, node: &ZNode, timeout: Duration) -> Result<()> {
        self.log
            .push(format!("{action}:{}:{}", node.name, timeout.as_secs()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().unwrap().contains(&node.name) {
            anyhow::bail!("{action} failed on {}", node.name);
        }
        self.log.push(format!("{action}-done:{}", node.name));
        Ok(())
    }
}

#[async_trait]
impl NodeService for RecordingService {
    async fn stop(&self, node: &ZNode, timeout: Duration) -> Result<()> {
        self.call("stop", node, timeout).await
    }

    async fn start(&self, node: &ZNode, timeout: Duration) -> Result<()> {
        self.call("start", node, timeout).await
    }
}

/// Readiness collaborator with fixed node lists
#[derive(Default)]
pub struct FakeCluster {
    log: EventLog,
    masters: Vec<String>,
    workers: Vec<String>,
    unreachable: bool,
}

impl FakeCluster {
    pub fn new(log: EventLog, masters: &[&str], workers: &[&str]) -> Self {
        Self {
            log,
            masters: masters.iter().map(|s| s.to_string()).collect(),
            workers: workers.iter().map(|s| s.to_string()).collect(),
            unreachable: false,
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl ClusterReadiness for FakeCluster {
    async fn wait_for_cluster_connectivity(&self, tries: u32) -> Result<()> {
        self.log.push(format!("connectivity:{tries}"));
        if self.unreachable {
            return Err(PowerError::ClusterUnreachable { tries }.into());
        }
        Ok(())
    }

    async fn wait_for_nodes_status(
        &self,
        node_names: &[String],
        status: NodeStatus,
        timeout: Duration,
    ) -> Result<()> {
        self.log.push(format!(
            "wait:{}:{}:{}",
            status,
            node_names.join(","),
            timeout.as_secs()
        ));
        Ok(())
    }

    async fn list_master_nodes(&self) -> Result<Vec<String>> {
        Ok(self.masters.clone())
    }

    async fn list_worker_nodes(&self) -> Result<Vec<String>> {
        Ok(self.workers.clone())
    }
}
