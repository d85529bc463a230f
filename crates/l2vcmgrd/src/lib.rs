//! l2vcmgrd - L2 virtual circuit configuration manager
//!
//! Reads pseudowires and local cross-connects from a device's running
//! configuration and writes them back through its line-oriented CLI. The
//! engine is generic over a table of CLI dialects; the desired state of the
//! device is always passed in by the caller.

pub mod commands;
pub mod config;
pub mod dialect;
mod l2vc_mgr;
pub mod parser;
pub mod registry;
pub mod state;
pub mod tables;
pub mod types;

pub use commands::{BatchKind, CommandBatch, UpdatePlan};
pub use config::{DeviceConfig, L2vcConfig, LoggingConfig};
pub use dialect::{Dialect, DialectId};
pub use l2vc_mgr::{L2vcMgr, ReconcileState, WriteOp, WritePlan};
pub use registry::InterfaceUsage;
pub use state::{CircuitConfig, DesiredState, EndpointConfig, InterfaceConfig, SubinterfaceConfig};
pub use types::{Circuit, CircuitKind, Endpoint, InterfaceRef, RemotePeer};
