//! Common infrastructure for the L2 virtual circuit configuration manager.
//!
//! This crate provides the pieces of `l2vcmgrd` that do not depend on the
//! circuit model itself:
//!
//! - [`shell`]: Safe shell command execution with proper quoting
//! - [`transport`]: The [`CliTransport`] seam used to reach a device CLI,
//!   plus the shell-backed [`ShellTransport`]
//! - [`error`]: Error types for reconciliation operations
//!
//! # Architecture
//!
//! The manager follows this pattern for every circuit:
//!
//! 1. Read the running configuration through a [`CliTransport`]
//! 2. Parse it with the configured CLI dialects
//! 3. Validate the desired circuit against the desired-state tree
//! 4. Render ordered command batches and hand them back to the transport
//!
//! # Example
//!
//! ```ignore
//! use l2vc_cfgmgr_common::{CliTransport, ShellTransport, CfgMgrResult};
//!
//! async fn show(name: &str) -> CfgMgrResult<String> {
//!     let mut cli = ShellTransport::new("/usr/bin/vtysh");
//!     cli.read(&format!("show running-config | section {}", name)).await
//! }
//! ```

pub mod error;
pub mod shell;
pub mod transport;

// Re-export commonly used items at crate root
pub use error::{CfgMgrError, CfgMgrResult};
pub use transport::{CliTransport, ShellTransport};
