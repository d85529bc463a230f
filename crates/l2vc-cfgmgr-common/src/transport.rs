//! CLI transport seam.
//!
//! The reconciliation engine never opens device sessions itself. It hands
//! ordered command batches to a [`CliTransport`] and reads raw text back.
//! Session handling, prompts, timeouts and retries all live behind this trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::shell::{self, build_cli_cmd, DEFAULT_CLI_PROGRAM};

/// A line-oriented device CLI.
#[async_trait]
pub trait CliTransport: Send {
    /// Executes an ordered batch of configuration lines as one unit.
    ///
    /// Returns the raw CLI output. Any failure aborts the batch.
    async fn run(&mut self, batch: &[String]) -> CfgMgrResult<String>;

    /// Executes a single show command and returns its raw output.
    async fn read(&mut self, command: &str) -> CfgMgrResult<String>;
}

/// Transport that pipes commands through a local CLI wrapper program.
#[derive(Debug, Clone)]
pub struct ShellTransport {
    program: String,
}

impl ShellTransport {
    /// Creates a transport invoking `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The wrapper program path.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for ShellTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CLI_PROGRAM)
    }
}

#[async_trait]
impl CliTransport for ShellTransport {
    async fn run(&mut self, batch: &[String]) -> CfgMgrResult<String> {
        if batch.is_empty() {
            return Ok(String::new());
        }

        let cmd = build_cli_cmd(&self.program, batch);
        let output = shell::exec_or_throw(&cmd).await.map_err(|e| match e {
            CfgMgrError::ShellCommandFailed { output, .. } => {
                CfgMgrError::transport(batch[0].trim(), output)
            }
            other => other,
        })?;

        info!(lines = batch.len(), "Applied command batch");
        Ok(output)
    }

    async fn read(&mut self, command: &str) -> CfgMgrResult<String> {
        debug!(command = %command, "Reading from device CLI");
        let cmd = build_cli_cmd(&self.program, &[command.to_string()]);
        shell::exec_or_throw(&cmd).await.map_err(|e| match e {
            CfgMgrError::ShellCommandFailed { output, .. } => {
                CfgMgrError::transport(command, output)
            }
            other => other,
        })
    }
}
