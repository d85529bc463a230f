//! Error types for l2vc reconciliation.
//!
//! All errors implement `std::error::Error` via `thiserror`. Parse mismatches
//! are carried in the same enum so that dialect fallback can log the reason,
//! but the read path never surfaces them to the caller.

use std::io;
use thiserror::Error;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur while reading or writing a circuit.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// The CLI transport rejected a command or batch.
    #[error("Transport failure on '{command}': {message}")]
    Transport {
        /// First line of the batch (or the read command).
        command: String,
        /// Error message reported by the transport.
        message: String,
    },

    /// A dialect did not recognise the CLI output.
    #[error("No {dialect} match: {reason}")]
    ParseMismatch {
        /// Dialect identifier.
        dialect: String,
        /// Why the dialect gave up.
        reason: String,
    },

    /// Wrong endpoint count, keys, types or role combination.
    #[error("Invalid circuit '{circuit}': {reason}")]
    InvalidCircuitShape {
        /// The circuit name.
        circuit: String,
        /// Which invariant was violated.
        reason: String,
    },

    /// Another circuit already owns the interface.
    #[error("Interface '{interface}' of circuit '{circuit}' is already used by circuit '{owner}'")]
    InterfaceConflict {
        /// The circuit being written.
        circuit: String,
        /// The conflicting interface reference.
        interface: String,
        /// The circuit already holding the interface.
        owner: String,
    },

    /// Referenced interface is not in the desired state.
    #[error("Interface '{interface}' does not exist")]
    UnknownInterface {
        /// The interface name.
        interface: String,
    },

    /// Referenced subinterface is not in the desired state.
    #[error("Subinterface {subinterface} of interface '{interface}' does not exist")]
    MissingSubinterface {
        /// The parent interface name.
        interface: String,
        /// The subinterface index.
        subinterface: u32,
    },

    /// Local endpoint's interface already carries an address.
    #[error("Interface '{interface}' has an IP address configured")]
    IpConfiguredOnInterface {
        /// The interface reference (`name` or `name.sub`).
        interface: String,
    },

    /// No configured dialect can express this circuit.
    #[error("No configured dialect supports {kind} circuit '{circuit}'")]
    UnsupportedCircuit {
        /// The circuit name.
        circuit: String,
        /// Role combination, e.g. "local-remote".
        kind: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Filesystem error while loading configuration or desired state.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CfgMgrError {
    /// Creates a transport error.
    pub fn transport(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a parse mismatch.
    pub fn parse_mismatch(dialect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseMismatch {
            dialect: dialect.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid circuit shape error.
    pub fn invalid_shape(circuit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCircuitShape {
            circuit: circuit.into(),
            reason: reason.into(),
        }
    }

    /// Creates an interface conflict error.
    pub fn conflict(
        circuit: impl Into<String>,
        interface: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::InterfaceConflict {
            circuit: circuit.into(),
            interface: interface.into(),
            owner: owner.into(),
        }
    }

    /// Creates an unknown interface error.
    pub fn unknown_interface(interface: impl Into<String>) -> Self {
        Self::UnknownInterface {
            interface: interface.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors that reject a write before any command runs.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            CfgMgrError::InvalidCircuitShape { .. }
                | CfgMgrError::InterfaceConflict { .. }
                | CfgMgrError::UnknownInterface { .. }
                | CfgMgrError::MissingSubinterface { .. }
                | CfgMgrError::IpConfiguredOnInterface { .. }
                | CfgMgrError::UnsupportedCircuit { .. }
        )
    }

    /// Returns true for errors raised by the CLI transport.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            CfgMgrError::Transport { .. }
                | CfgMgrError::ShellExec { .. }
                | CfgMgrError::ShellCommandFailed { .. }
        )
    }
}
