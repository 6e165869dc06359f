//! Process execution
//!
//! Runs shell commands on the host and captures their output.

mod shell;

use anyhow::Result;
use async_trait::async_trait;

pub use shell::ShellRunner;

/// Captured result of a finished command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn with_stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Something that can execute a shell command string
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `cmd` and return its captured output
    async fn run(&self, cmd: &str) -> Result<CommandOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_helpers() {
        let output = CommandOutput::with_stdout(b"shut off\n".to_vec());
        assert!(output.success());
        assert_eq!(output.stdout_str(), "shut off\n");
        assert!(output.stderr_str().is_empty());
    }
}
