//! Test fixtures for circuit reconciliation
//!
//! Desired-state trees are produced as JSON so that any consumer can load
//! them through its own deserializer.

use serde_json::{json, Map, Value};

/// Builder for a desired-state JSON document
#[derive(Debug, Clone, Default)]
pub struct StateFixture {
    circuits: Map<String, Value>,
    interfaces: Map<String, Value>,
}

impl StateFixture {
    pub fn new() -> Self {
        Self::default()
    }

    fn interface_entry(&mut self, name: &str) -> &mut Map<String, Value> {
        let entry = self
            .interfaces
            .entry(name.to_string())
            .or_insert_with(|| json!({ "addresses": [], "subinterfaces": {} }));
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("interface entries are always objects"),
        }
    }

    fn subinterfaces(&mut self, name: &str) -> &mut Map<String, Value> {
        match self
            .interface_entry(name)
            .entry("subinterfaces")
            .or_insert_with(|| json!({}))
        {
            Value::Object(map) => map,
            _ => unreachable!("subinterfaces are always objects"),
        }
    }

    /// Adds an interface with no addresses
    pub fn interface(mut self, name: &str) -> Self {
        self.interface_entry(name);
        self
    }

    /// Adds sub-interface `name.index` (and its parent)
    pub fn subinterface(mut self, name: &str, index: u32) -> Self {
        self.subinterfaces(name)
            .entry(index.to_string())
            .or_insert_with(|| json!({ "addresses": [] }));
        self
    }

    /// Assigns an address to an interface or one of its sub-interfaces
    pub fn address(mut self, name: &str, subinterface: Option<u32>, address: &str) -> Self {
        let target = match subinterface {
            None => self.interface_entry(name),
            Some(index) => {
                let subs = self.subinterfaces(name);
                match subs
                    .entry(index.to_string())
                    .or_insert_with(|| json!({ "addresses": [] }))
                {
                    Value::Object(map) => map,
                    _ => unreachable!("subinterface entries are always objects"),
                }
            }
        };
        if let Some(Value::Array(list)) = target.get_mut("addresses") {
            list.push(json!(address));
        } else {
            target.insert("addresses".to_string(), json!([address]));
        }
        self
    }

    /// Adds a circuit with endpoints "1" and "2"
    pub fn circuit(mut self, name: &str, first: Value, second: Value) -> Self {
        self.circuits.insert(
            name.to_string(),
            json!({ "endpoints": { "1": first, "2": second } }),
        );
        self
    }

    /// Adds a circuit with an arbitrary endpoint map
    pub fn raw_circuit(mut self, name: &str, endpoints: Value) -> Self {
        self.circuits
            .insert(name.to_string(), json!({ "endpoints": endpoints }));
        self
    }

    pub fn to_value(&self) -> Value {
        json!({
            "circuits": Value::Object(self.circuits.clone()),
            "interfaces": Value::Object(self.interfaces.clone()),
        })
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

/// Endpoint fixtures
pub mod endpoint_fixtures {
    use super::*;

    /// Local endpoint on a port
    pub fn local(interface: &str) -> Value {
        json!({ "type": "local", "interface": interface })
    }

    /// Local endpoint on a sub-interface
    pub fn local_sub(interface: &str, subinterface: u32) -> Value {
        json!({ "type": "local", "interface": interface, "subinterface": subinterface })
    }

    /// Remote pseudowire endpoint
    pub fn remote(address: &str, vc_id: u32) -> Value {
        json!({
            "type": "remote",
            "remote-address": address,
            "virtual-circuit-identifier": vc_id,
        })
    }
}

/// Running-config text as devices print it
pub mod cli_fixtures {
    /// IOS XR pseudowire with an untagged attachment
    pub fn iosxr_pseudowire(name: &str, interface: &str, peer: &str, vc_id: u32) -> String {
        format!(
            "l2vpn\n xconnect group {name}\n  p2p {name}\n   interface {interface}\n   neighbor ipv4 {peer} pw-id {vc_id}\n   !\n  !\n !\n!\n"
        )
    }

    /// IOS XR cross-connect between two interfaces
    pub fn iosxr_cross_connect(name: &str, first: &str, second: &str) -> String {
        format!(
            "l2vpn\n xconnect group {name}\n  p2p {name}\n   interface {first}\n   interface {second}\n  !\n !\n!\n"
        )
    }

    /// IronWare pseudowire with a tagged attachment
    pub fn ironware_pseudowire_tagged(
        name: &str,
        vc_id: u32,
        peer: &str,
        vlan: u32,
        interface: &str,
    ) -> String {
        format!(
            "router mpls\n vll {name} {vc_id}\n  vll-peer {peer}\n  vlan {vlan}\n   tagged {interface}\n"
        )
    }

    /// IronWare local cross-connect with two untagged attachments
    pub fn ironware_cross_connect(name: &str, first: &str, second: &str) -> String {
        format!("router mpls\n vll-local {name}\n  untagged {first}\n  untagged {second}\n")
    }

    /// IOS connect statement
    pub fn ios_connect(name: &str, first: &str, second: &str) -> String {
        format!("connect {name} {first} {second}\n")
    }
}
