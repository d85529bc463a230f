//! Verification helpers for recorded CLI commands

use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected a command containing '{expected}', got {actual:?}")]
    CommandNotFound { expected: String, actual: Vec<String> },

    #[error("Command containing '{unexpected}' was executed: {actual:?}")]
    UnexpectedCommand {
        unexpected: String,
        actual: Vec<String>,
    },

    #[error("Expected {expected} commands, found {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Expected '{first}' before '{second}'")]
    OrderMismatch { first: String, second: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Command execution verifier
///
/// Matching is by substring on trimmed command lines.
pub struct CommandVerifier {
    captured_commands: Vec<String>,
}

impl CommandVerifier {
    pub fn new(captured_commands: Vec<String>) -> Self {
        Self { captured_commands }
    }

    fn position(&self, fragment: &str) -> Option<usize> {
        self.captured_commands
            .iter()
            .position(|cmd| cmd.contains(fragment))
    }

    fn last_position(&self, fragment: &str) -> Option<usize> {
        self.captured_commands
            .iter()
            .rposition(|cmd| cmd.contains(fragment))
    }

    /// Verify that a matching command was executed
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        match self.position(expected) {
            Some(_) => Ok(()),
            None => Err(VerificationError::CommandNotFound {
                expected: expected.to_string(),
                actual: self.captured_commands.clone(),
            }),
        }
    }

    /// Verify that no matching command was executed
    pub fn assert_command_not_executed(&self, unexpected: &str) -> VerifyResult<()> {
        match self.position(unexpected) {
            Some(_) => Err(VerificationError::UnexpectedCommand {
                unexpected: unexpected.to_string(),
                actual: self.captured_commands.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Verify the number of executed lines
    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.captured_commands.len();
        if actual != expected {
            return Err(VerificationError::CountMismatch { expected, actual });
        }
        Ok(())
    }

    /// Verify that every command matching `first` precedes every command
    /// matching `second`
    pub fn assert_before(&self, first: &str, second: &str) -> VerifyResult<()> {
        self.assert_command_executed(first)?;
        self.assert_command_executed(second)?;

        match (self.last_position(first), self.position(second)) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::OrderMismatch {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }

    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }
}
