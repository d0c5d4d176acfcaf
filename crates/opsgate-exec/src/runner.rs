use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;

/// Captured outcome of one executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    /// Process exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Merged stdout + stderr, in that order.
    pub output: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes command lines whose text the caller does not control.
///
/// No timeout is applied: a hanging command stalls only the connection that
/// issued it. This mirrors the relay's documented resource model.
#[async_trait]
pub trait UntrustedRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<ExecResult, ExecError>;
}

/// Runs commands via `<shell> -c <command>` with no confinement.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("bash")
    }
}

#[async_trait]
impl UntrustedRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<ExecResult, ExecError> {
        debug!(shell = %self.shell, command, "executing command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .output()
            .await
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        let exit_code = output.status.code().unwrap_or(-1);
        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecResult {
            exit_code,
            output: merged,
        })
    }
}
