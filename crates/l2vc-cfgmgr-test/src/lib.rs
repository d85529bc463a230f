//! Test infrastructure for the L2 virtual circuit configuration manager
//!
//! Provides:
//! - A recording CLI transport with canned show output and injected failures
//! - Desired-state and running-config fixtures
//! - Command verification helpers

pub mod fixtures;
mod recording;
mod verification;

pub use fixtures::*;
pub use recording::RecordingTransport;
pub use verification::*;
