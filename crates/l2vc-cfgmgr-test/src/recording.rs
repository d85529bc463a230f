//! Recording CLI transport

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult, CliTransport};

use crate::verification::CommandVerifier;

/// In-memory [`CliTransport`] for tests
///
/// Show commands answer from a table of canned outputs (empty output when
/// unknown). Batches are recorded in execution order. A batch or read that
/// contains a registered failure fragment fails with a transport error and is
/// not recorded as executed.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    outputs: HashMap<String, String>,
    fail_on: Vec<String>,
    batches: Vec<Vec<String>>,
    failed: Vec<Vec<String>>,
    reads: Vec<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `command` with `output`
    pub fn with_output(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.outputs.insert(command.into(), output.into());
        self
    }

    /// Fails any batch or read with a line containing `fragment`
    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on.push(fragment.into());
        self
    }

    /// Successfully executed batches, in order
    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }

    /// Batches rejected by an injected failure
    pub fn failed_batches(&self) -> &[Vec<String>] {
        &self.failed
    }

    /// Show commands issued, in order
    pub fn reads(&self) -> &[String] {
        &self.reads
    }

    /// Every executed line, trimmed, in order
    pub fn commands(&self) -> Vec<String> {
        self.batches
            .iter()
            .flatten()
            .map(|line| line.trim().to_string())
            .collect()
    }

    /// Verifier over the executed lines
    pub fn verifier(&self) -> CommandVerifier {
        CommandVerifier::new(self.commands())
    }

    /// Forgets everything recorded, keeping outputs and failures
    pub fn clear(&mut self) {
        self.batches.clear();
        self.failed.clear();
        self.reads.clear();
    }

    fn injected_failure<'a>(&self, lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
        lines.into_iter().find_map(|line| {
            self.fail_on
                .iter()
                .find(|fragment| line.contains(fragment.as_str()))
                .cloned()
        })
    }
}

#[async_trait]
impl CliTransport for RecordingTransport {
    async fn run(&mut self, batch: &[String]) -> CfgMgrResult<String> {
        let head = batch.first().map(|l| l.trim().to_string()).unwrap_or_default();

        if let Some(fragment) = self.injected_failure(batch.iter().map(String::as_str)) {
            self.failed.push(batch.to_vec());
            return Err(CfgMgrError::transport(
                head,
                format!("injected failure on '{}'", fragment),
            ));
        }

        info!("Recorded batch: {}", head);
        self.batches.push(batch.to_vec());
        Ok(String::new())
    }

    async fn read(&mut self, command: &str) -> CfgMgrResult<String> {
        self.reads.push(command.to_string());

        if let Some(fragment) = self.injected_failure([command]) {
            return Err(CfgMgrError::transport(
                command,
                format!("injected failure on '{}'", fragment),
            ));
        }

        Ok(self.outputs.get(command).cloned().unwrap_or_default())
    }
}
