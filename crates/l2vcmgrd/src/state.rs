//! Desired-state tree supplied by the caller
//!
//! The engine never reaches into a datastore on its own: every write is given
//! the full desired tree of the device, which carries both the circuits and
//! the interfaces they may bind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::tables::{endpoint_types, ENDPOINT_KEY_1, ENDPOINT_KEY_2};
use crate::types::InterfaceRef;

/// One endpoint as it appears in the desired tree
///
/// Fields are loosely typed on purpose so that shape errors surface as
/// `InvalidCircuitShape` at circuit construction instead of as a
/// deserialization failure of the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// "local" or "remote"
    #[serde(rename = "type")]
    pub endpoint_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subinterface: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_circuit_identifier: Option<u32>,
}

impl EndpointConfig {
    /// Local endpoint on `interface` (optionally a sub-interface of it)
    pub fn local(interface: impl Into<String>, subinterface: Option<u32>) -> Self {
        Self {
            endpoint_type: endpoint_types::LOCAL.to_string(),
            interface: Some(interface.into()),
            subinterface: subinterface.map(serde_json::Value::from),
            ..Default::default()
        }
    }

    /// Remote endpoint towards `address` with circuit id `vc_id`
    pub fn remote(address: impl Into<String>, vc_id: u32) -> Self {
        Self {
            endpoint_type: endpoint_types::REMOTE.to_string(),
            remote_address: Some(address.into()),
            virtual_circuit_identifier: Some(vc_id),
            ..Default::default()
        }
    }
}

/// A circuit entry: positional key -> endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointConfig>,
}

impl CircuitConfig {
    /// Circuit with endpoints "1" and "2"
    pub fn new(first: EndpointConfig, second: EndpointConfig) -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(ENDPOINT_KEY_1.to_string(), first);
        endpoints.insert(ENDPOINT_KEY_2.to_string(), second);
        Self { endpoints }
    }
}

/// Sub-interface entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubinterfaceConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Interface entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub subinterfaces: BTreeMap<u32, SubinterfaceConfig>,
}

/// Full desired configuration of one device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub circuits: BTreeMap<String, CircuitConfig>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document
    pub fn from_json(json: &str) -> CfgMgrResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CfgMgrError::invalid_config("desired state", e.to_string()))
    }

    /// Loads a JSON document from disk
    pub fn load(path: impl AsRef<Path>) -> CfgMgrResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CfgMgrError::invalid_config(
                "desired state",
                format!("Failed to parse {}: {}", path.display(), e),
            )
        })
    }

    pub fn circuit(&self, name: &str) -> Option<&CircuitConfig> {
        self.circuits.get(name)
    }

    /// Adds an interface with no addresses
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.entry(name.into()).or_default();
        self
    }

    /// Adds a sub-interface (and its parent if missing)
    pub fn with_subinterface(mut self, name: impl Into<String>, index: u32) -> Self {
        self.interfaces
            .entry(name.into())
            .or_default()
            .subinterfaces
            .entry(index)
            .or_default();
        self
    }

    /// Assigns an address to an interface or sub-interface, creating it
    pub fn with_address(mut self, target: &InterfaceRef, address: impl Into<String>) -> Self {
        let ifc = self.interfaces.entry(target.name.clone()).or_default();
        match target.subinterface {
            None => ifc.addresses.push(address.into()),
            Some(index) => ifc
                .subinterfaces
                .entry(index)
                .or_default()
                .addresses
                .push(address.into()),
        }
        self
    }

    pub fn with_circuit(mut self, name: impl Into<String>, circuit: CircuitConfig) -> Self {
        self.circuits.insert(name.into(), circuit);
        self
    }

    /// Confirms that `target` exists and carries no IP address
    pub fn check_attachable(&self, target: &InterfaceRef) -> CfgMgrResult<()> {
        let ifc = self
            .interfaces
            .get(&target.name)
            .ok_or_else(|| CfgMgrError::unknown_interface(target.name.clone()))?;

        let addresses = match target.subinterface {
            None => &ifc.addresses,
            Some(index) => {
                &ifc.subinterfaces
                    .get(&index)
                    .ok_or_else(|| CfgMgrError::MissingSubinterface {
                        interface: target.name.clone(),
                        subinterface: index,
                    })?
                    .addresses
            }
        };

        if !addresses.is_empty() {
            return Err(CfgMgrError::IpConfiguredOnInterface {
                interface: target.to_string(),
            });
        }
        Ok(())
    }
}
