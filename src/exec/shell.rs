//! `sh -c` backed command runner

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{CommandOutput, CommandRunner};
use crate::error::PowerError;

/// Runs commands through `sh -c`
#[derive(Clone, Debug, Default)]
pub struct ShellRunner {
    ignore_errors: bool,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return non-zero exits as output instead of failing
    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, cmd: &str) -> Result<CommandOutput> {
        debug!("Executing command: {}", cmd);

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .await
            .with_context(|| format!("Failed to execute command: {cmd}"))?;

        let result = CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        };

        debug!("Command exited with code {}", result.exit_code);

        if !result.success() && !self.ignore_errors {
            return Err(PowerError::CommandFailed {
                command: cmd.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr_str().trim().to_string(),
            }
            .into());
        }

        Ok(result)
    }
}
