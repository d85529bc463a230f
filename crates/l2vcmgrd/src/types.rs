//! Circuit model for l2vcmgrd

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::state::{CircuitConfig, EndpointConfig};
use crate::tables::{endpoint_types, ENDPOINT_KEYS, ENDPOINT_KEY_1, ENDPOINT_KEY_2};

/// Interface reference: a port, or a tagged sub-interface of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceRef {
    /// Interface name as the device CLI spells it
    pub name: String,
    /// Sub-interface index (doubles as the VLAN id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subinterface: Option<u32>,
}

impl InterfaceRef {
    /// Untagged reference to `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subinterface: None,
        }
    }

    /// Tagged reference to `name.subinterface`
    pub fn tagged(name: impl Into<String>, subinterface: u32) -> Self {
        Self {
            name: name.into(),
            subinterface: Some(subinterface),
        }
    }

    /// Returns true for a sub-interface reference
    pub fn is_tagged(&self) -> bool {
        self.subinterface.is_some()
    }

    /// The parent form (same name, no sub-index)
    pub fn parent(&self) -> InterfaceRef {
        InterfaceRef::new(self.name.clone())
    }

    /// Two references collide if they name the same port and either one is
    /// the parent form or both carry the same sub-index
    pub fn collides_with(&self, other: &InterfaceRef) -> bool {
        self.name == other.name
            && (self.subinterface == other.subinterface
                || self.subinterface.is_none()
                || other.subinterface.is_none())
    }

    /// Splits `"name.sub"` at the last dot; a non-numeric suffix keeps the
    /// whole string as the name
    pub fn parse(s: &str) -> Self {
        if let Some((name, sub)) = s.rsplit_once('.') {
            if !name.is_empty() {
                if let Ok(index) = sub.parse::<u32>() {
                    return InterfaceRef::tagged(name, index);
                }
            }
        }
        InterfaceRef::new(s)
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subinterface {
            Some(sub) => write!(f, "{}.{}", self.name, sub),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Remote pseudowire peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemotePeer {
    /// Peer loopback address
    pub address: Ipv4Addr,
    /// Virtual circuit identifier shared by both pseudowire ends
    pub vc_id: u32,
}

impl RemotePeer {
    pub fn new(address: Ipv4Addr, vc_id: u32) -> Self {
        Self { address, vc_id }
    }
}

/// One side of a circuit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Endpoint {
    /// Bound to a local interface
    Local(InterfaceRef),
    /// Bound to a remote peer
    Remote(RemotePeer),
}

impl Endpoint {
    pub fn is_local(&self) -> bool {
        matches!(self, Endpoint::Local(_))
    }

    pub fn as_local(&self) -> Option<&InterfaceRef> {
        match self {
            Endpoint::Local(r) => Some(r),
            Endpoint::Remote(_) => None,
        }
    }

    fn role(&self) -> &'static str {
        match self {
            Endpoint::Local(_) => endpoint_types::LOCAL,
            Endpoint::Remote(_) => endpoint_types::REMOTE,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local(r) => write!(f, "local {}", r),
            Endpoint::Remote(p) => write!(f, "remote {} vc {}", p.address, p.vc_id),
        }
    }
}

/// Role combination of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitKind {
    /// Cross-connect between two local interfaces
    LocalLocal,
    /// Pseudowire from a local interface to a remote peer
    LocalRemote,
}

impl CircuitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitKind::LocalLocal => "local-local",
            CircuitKind::LocalRemote => "local-remote",
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-to-point L2 circuit
///
/// Always holds exactly two endpoints and never `(Remote, Remote)`. The local
/// endpoint of a pseudowire is always endpoint "1".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circuit {
    name: String,
    endpoints: [Endpoint; 2],
}

impl Circuit {
    /// Builds a circuit from endpoints "1" and "2"
    pub fn new(name: impl Into<String>, first: Endpoint, second: Endpoint) -> CfgMgrResult<Self> {
        let name = name.into();
        let endpoints = match (first, second) {
            (Endpoint::Remote(_), Endpoint::Remote(_)) => {
                return Err(CfgMgrError::invalid_shape(
                    name,
                    "both endpoints are remote",
                ));
            }
            (remote @ Endpoint::Remote(_), local @ Endpoint::Local(_)) => [local, remote],
            (first, second) => [first, second],
        };
        Ok(Self { name, endpoints })
    }

    /// Cross-connect between two local interfaces
    pub fn local_local(
        name: impl Into<String>,
        first: InterfaceRef,
        second: InterfaceRef,
    ) -> CfgMgrResult<Self> {
        Self::new(name, Endpoint::Local(first), Endpoint::Local(second))
    }

    /// Pseudowire from `local` to `remote`
    pub fn local_remote(
        name: impl Into<String>,
        local: InterfaceRef,
        remote: RemotePeer,
    ) -> CfgMgrResult<Self> {
        Self::new(name, Endpoint::Local(local), Endpoint::Remote(remote))
    }

    /// Builds a circuit from its desired-state configuration
    pub fn from_config(name: &str, config: &CircuitConfig) -> CfgMgrResult<Self> {
        if config.endpoints.len() != ENDPOINT_KEYS.len() {
            return Err(CfgMgrError::invalid_shape(
                name,
                format!(
                    "expected {} endpoints, found {}",
                    ENDPOINT_KEYS.len(),
                    config.endpoints.len()
                ),
            ));
        }

        let endpoint = |key: &str| -> CfgMgrResult<Endpoint> {
            let ep = config.endpoints.get(key).ok_or_else(|| {
                CfgMgrError::invalid_shape(name, format!("missing endpoint '{}'", key))
            })?;
            endpoint_from_config(name, key, ep)
        };

        Self::new(name, endpoint(ENDPOINT_KEY_1)?, endpoint(ENDPOINT_KEY_2)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint by positional key ("1" or "2")
    pub fn endpoint(&self, key: &str) -> Option<&Endpoint> {
        match key {
            ENDPOINT_KEY_1 => Some(&self.endpoints[0]),
            ENDPOINT_KEY_2 => Some(&self.endpoints[1]),
            _ => None,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint; 2] {
        &self.endpoints
    }

    pub fn kind(&self) -> CircuitKind {
        match self.endpoints[1] {
            Endpoint::Local(_) => CircuitKind::LocalLocal,
            Endpoint::Remote(_) => CircuitKind::LocalRemote,
        }
    }

    /// Local interface references in endpoint order
    pub fn local_endpoints(&self) -> impl Iterator<Item = &InterfaceRef> {
        self.endpoints.iter().filter_map(Endpoint::as_local)
    }

    /// Role name of each endpoint, for logging
    pub fn roles(&self) -> (&'static str, &'static str) {
        (self.endpoints[0].role(), self.endpoints[1].role())
    }

    /// The remote peer of a pseudowire
    pub fn remote(&self) -> Option<&RemotePeer> {
        match &self.endpoints[1] {
            Endpoint::Remote(peer) => Some(peer),
            Endpoint::Local(_) => None,
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {{1: {}, 2: {}}}",
            self.name, self.endpoints[0], self.endpoints[1]
        )
    }
}

fn endpoint_from_config(circuit: &str, key: &str, ep: &EndpointConfig) -> CfgMgrResult<Endpoint> {
    match ep.endpoint_type.as_str() {
        endpoint_types::LOCAL => {
            let name = ep.interface.as_deref().filter(|n| !n.is_empty()).ok_or_else(|| {
                CfgMgrError::invalid_shape(circuit, format!("endpoint '{}' has no interface", key))
            })?;
            let subinterface = match &ep.subinterface {
                None | Some(serde_json::Value::Null) => None,
                Some(value) => {
                    let index = value.as_u64().ok_or_else(|| {
                        CfgMgrError::invalid_shape(
                            circuit,
                            format!(
                                "endpoint '{}' subinterface must be a non-negative integer, got {}",
                                key, value
                            ),
                        )
                    })?;
                    let index = u32::try_from(index).map_err(|_| {
                        CfgMgrError::invalid_shape(
                            circuit,
                            format!(
                                "endpoint '{}' subinterface {} is out of range (max {})",
                                key,
                                index,
                                u32::MAX
                            ),
                        )
                    })?;
                    Some(index)
                }
            };
            Ok(Endpoint::Local(InterfaceRef {
                name: name.to_string(),
                subinterface,
            }))
        }
        endpoint_types::REMOTE => {
            let address = ep.remote_address.as_deref().ok_or_else(|| {
                CfgMgrError::invalid_shape(
                    circuit,
                    format!("endpoint '{}' has no remote address", key),
                )
            })?;
            let address: Ipv4Addr = address.parse().map_err(|_| {
                CfgMgrError::invalid_shape(
                    circuit,
                    format!("endpoint '{}' remote address '{}' is not IPv4", key, address),
                )
            })?;
            let vc_id = ep.virtual_circuit_identifier.ok_or_else(|| {
                CfgMgrError::invalid_shape(
                    circuit,
                    format!("endpoint '{}' has no virtual circuit identifier", key),
                )
            })?;
            Ok(Endpoint::Remote(RemotePeer::new(address, vc_id)))
        }
        other => Err(CfgMgrError::invalid_shape(
            circuit,
            format!("endpoint '{}' has unknown type '{}'", key, other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn peer() -> RemotePeer {
        RemotePeer::new("10.0.0.5".parse().unwrap(), 100)
    }

    #[test]
    fn test_interface_ref_display() {
        assert_eq!(InterfaceRef::new("eth0").to_string(), "eth0");
        assert_eq!(InterfaceRef::tagged("eth0", 5).to_string(), "eth0.5");
    }

    #[test]
    fn test_interface_ref_parse() {
        assert_eq!(InterfaceRef::parse("Gi0/1.20"), InterfaceRef::tagged("Gi0/1", 20));
        assert_eq!(InterfaceRef::parse("Gi0/1"), InterfaceRef::new("Gi0/1"));
        assert_eq!(InterfaceRef::parse("eth.abc"), InterfaceRef::new("eth.abc"));
        assert_eq!(InterfaceRef::parse(".5"), InterfaceRef::new(".5"));
    }

    #[test]
    fn test_collides_with_parent() {
        let parent = InterfaceRef::new("eth0");
        let sub5 = InterfaceRef::tagged("eth0", 5);
        let sub6 = InterfaceRef::tagged("eth0", 6);

        assert!(parent.collides_with(&parent));
        assert!(sub5.collides_with(&parent));
        assert!(parent.collides_with(&sub5));
        assert!(!sub5.collides_with(&sub6));
        assert!(!parent.collides_with(&InterfaceRef::new("eth1")));
    }

    #[test]
    fn test_remote_remote_rejected() {
        let err = Circuit::new("pw", Endpoint::Remote(peer()), Endpoint::Remote(peer()))
            .unwrap_err();
        assert!(matches!(err, CfgMgrError::InvalidCircuitShape { .. }));
    }

    #[test]
    fn test_allowed_combinations() {
        let c = Circuit::local_local("xc", InterfaceRef::new("eth1"), InterfaceRef::new("eth2"))
            .unwrap();
        assert_eq!(c.kind(), CircuitKind::LocalLocal);
        assert_eq!(c.local_endpoints().count(), 2);
        assert!(c.remote().is_none());

        let c = Circuit::local_remote("pw", InterfaceRef::new("eth1/2"), peer()).unwrap();
        assert_eq!(c.kind(), CircuitKind::LocalRemote);
        assert_eq!(c.remote(), Some(&peer()));
    }

    #[test]
    fn test_remote_first_is_normalized() {
        let c = Circuit::new(
            "pw",
            Endpoint::Remote(peer()),
            Endpoint::Local(InterfaceRef::new("eth1")),
        )
        .unwrap();
        assert_eq!(c.endpoint("1"), Some(&Endpoint::Local(InterfaceRef::new("eth1"))));
        assert_eq!(c.endpoint("2"), Some(&Endpoint::Remote(peer())));
        assert_eq!(c.endpoint("3"), None);
        assert_eq!(c.roles(), ("local", "remote"));
    }

    #[test]
    fn test_display() {
        let c = Circuit::local_remote("pw", InterfaceRef::tagged("eth1", 20), peer()).unwrap();
        assert_eq!(c.to_string(), "pw {1: local eth1.20, 2: remote 10.0.0.5 vc 100}");
    }

    fn config(endpoints: serde_json::Value) -> CircuitConfig {
        serde_json::from_value(serde_json::json!({ "endpoints": endpoints })).unwrap()
    }

    fn shape_reason(endpoints: serde_json::Value) -> String {
        match Circuit::from_config("c1", &config(endpoints)) {
            Err(CfgMgrError::InvalidCircuitShape { circuit, reason }) => {
                assert_eq!(circuit, "c1");
                reason
            }
            other => panic!("expected a shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_config_rejects_bad_shapes() {
        use serde_json::json;

        let eth1 = json!({"type": "local", "interface": "eth1"});
        let cases = vec![
            (json!({"1": eth1}), "expected 2 endpoints, found 1"),
            (
                json!({"1": eth1, "2": eth1, "3": eth1}),
                "expected 2 endpoints, found 3",
            ),
            (json!({"1": eth1, "3": eth1}), "missing endpoint '2'"),
            (
                json!({"1": eth1, "2": {"type": "local", "interface": "eth2", "subinterface": "5"}}),
                "must be a non-negative integer, got \"5\"",
            ),
            (
                json!({"1": eth1, "2": {"type": "local", "interface": "eth2", "subinterface": -1}}),
                "must be a non-negative integer, got -1",
            ),
            (
                json!({"1": eth1, "2": {"type": "local", "interface": "eth2", "subinterface": 5.5}}),
                "must be a non-negative integer, got 5.5",
            ),
            (
                json!({"1": eth1, "2": {"type": "local", "interface": "eth2", "subinterface": 4294967296u64}}),
                "subinterface 4294967296 is out of range",
            ),
            (
                json!({"1": eth1, "2": {"type": "tunnel"}}),
                "unknown type 'tunnel'",
            ),
            (
                json!({"1": eth1, "2": {"type": "local"}}),
                "endpoint '2' has no interface",
            ),
            (
                json!({"1": eth1, "2": {"type": "remote", "remote-address": "::1", "virtual-circuit-identifier": 7}}),
                "remote address '::1' is not IPv4",
            ),
            (
                json!({"1": eth1, "2": {"type": "remote", "remote-address": "10.0.0.5"}}),
                "no virtual circuit identifier",
            ),
            (
                json!({
                    "1": {"type": "remote", "remote-address": "10.0.0.5", "virtual-circuit-identifier": 1},
                    "2": {"type": "remote", "remote-address": "10.0.0.6", "virtual-circuit-identifier": 1},
                }),
                "both endpoints are remote",
            ),
        ];

        for (endpoints, expected) in cases {
            let reason = shape_reason(endpoints.clone());
            assert!(
                reason.contains(expected),
                "{} -> '{}', expected '{}'",
                endpoints,
                reason,
                expected
            );
        }
    }

    #[test]
    fn test_from_config_accepts_largest_subinterface() {
        let c = Circuit::from_config(
            "c1",
            &config(serde_json::json!({
                "1": {"type": "local", "interface": "eth1", "subinterface": u32::MAX},
                "2": {"type": "local", "interface": "eth2", "subinterface": null},
            })),
        )
        .unwrap();
        assert_eq!(c.endpoint("1"), Some(&Endpoint::Local(InterfaceRef::tagged("eth1", u32::MAX))));
        assert_eq!(c.endpoint("2"), Some(&Endpoint::Local(InterfaceRef::new("eth2"))));
    }

    #[test]
    fn test_endpoint_serde() {
        let ep = Endpoint::Local(InterfaceRef::tagged("eth3", 20));
        let json = serde_json::to_value(&ep).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "local", "name": "eth3", "subinterface": 20})
        );
    }
}
