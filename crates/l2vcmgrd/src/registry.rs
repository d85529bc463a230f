//! Interface usage registry
//!
//! Rebuilt from the desired-state tree on every write; never cached.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::state::DesiredState;
use crate::types::{Circuit, InterfaceRef};

/// Interfaces bound to local endpoints of other circuits
#[derive(Debug, Clone, Default)]
pub struct InterfaceUsage {
    /// reference -> owning circuit
    used: HashMap<InterfaceRef, String>,
}

impl InterfaceUsage {
    /// Scans every circuit in `state` except `exclude`
    ///
    /// Sibling circuits with an invalid shape are skipped; they are rejected
    /// when they themselves are written.
    pub fn collect(state: &DesiredState, exclude: &str) -> Self {
        let mut used = HashMap::new();

        for (name, config) in state.circuits.iter().filter(|(name, _)| *name != exclude) {
            let circuit = match Circuit::from_config(name, config) {
                Ok(circuit) => circuit,
                Err(e) => {
                    warn!("Skipping sibling circuit {} in usage scan: {}", name, e);
                    continue;
                }
            };
            for local in circuit.local_endpoints() {
                used.insert(local.clone(), name.clone());
            }
        }

        debug!("Collected {} interface references excluding {}", used.len(), exclude);
        Self { used }
    }

    /// Fails if `reference`, its parent, or one of its sub-interfaces is
    /// already in use
    pub fn check(&self, circuit: &str, reference: &InterfaceRef) -> CfgMgrResult<()> {
        // Iterate in a stable order so the reported owner is deterministic.
        let mut owners: Vec<(&InterfaceRef, &String)> = self
            .used
            .iter()
            .filter(|(used, _)| used.collides_with(reference))
            .collect();
        owners.sort();

        match owners.first() {
            Some((_, owner)) => Err(CfgMgrError::conflict(
                circuit,
                reference.to_string(),
                owner.as_str(),
            )),
            None => Ok(()),
        }
    }

    /// Stringified references, as the registry set
    pub fn references(&self) -> BTreeSet<String> {
        self.used.keys().map(ToString::to_string).collect()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.used.keys().any(|r| r.to_string() == reference)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// Fails if the two local endpoints of a cross-connect collide with each other
pub fn check_self_collision(circuit: &Circuit) -> CfgMgrResult<()> {
    let locals: Vec<&InterfaceRef> = circuit.local_endpoints().collect();
    if let [first, second] = locals.as_slice() {
        if first.collides_with(second) {
            return Err(CfgMgrError::conflict(
                circuit.name(),
                second.to_string(),
                circuit.name(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CircuitConfig, EndpointConfig};
    use pretty_assertions::assert_eq;

    fn state() -> DesiredState {
        DesiredState::new()
            .with_circuit(
                "pw-a",
                CircuitConfig::new(
                    EndpointConfig::local("eth0", None),
                    EndpointConfig::remote("10.0.0.1", 1),
                ),
            )
            .with_circuit(
                "xc-b",
                CircuitConfig::new(
                    EndpointConfig::local("eth1", Some(10)),
                    EndpointConfig::local("eth2", None),
                ),
            )
            .with_circuit(
                "broken",
                CircuitConfig::new(
                    EndpointConfig::remote("10.0.0.2", 2),
                    EndpointConfig::remote("10.0.0.3", 3),
                ),
            )
    }

    #[test]
    fn test_collect_excludes_self() {
        let usage = InterfaceUsage::collect(&state(), "pw-a");
        let expected: BTreeSet<String> = ["eth1.10", "eth2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(usage.references(), expected);
        assert!(!usage.contains("eth0"));
        assert_eq!(usage.len(), 2);
    }

    #[test]
    fn test_same_interface_conflicts() {
        let usage = InterfaceUsage::collect(&state(), "new");
        let err = usage.check("new", &InterfaceRef::new("eth0")).unwrap_err();
        match err {
            CfgMgrError::InterfaceConflict { interface, owner, .. } => {
                assert_eq!(interface, "eth0");
                assert_eq!(owner, "pw-a");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sub_of_used_parent_conflicts() {
        let usage = InterfaceUsage::collect(&state(), "new");
        assert!(usage.check("new", &InterfaceRef::tagged("eth0", 5)).is_err());
    }

    #[test]
    fn test_parent_of_used_sub_conflicts() {
        let usage = InterfaceUsage::collect(&state(), "new");
        assert!(usage.check("new", &InterfaceRef::new("eth1")).is_err());
    }

    #[test]
    fn test_sibling_sub_is_free() {
        let usage = InterfaceUsage::collect(&state(), "new");
        assert!(usage.check("new", &InterfaceRef::tagged("eth1", 11)).is_ok());
        assert!(usage.check("new", &InterfaceRef::new("eth3")).is_ok());
    }

    #[test]
    fn test_self_collision() {
        let c = Circuit::local_local("xc", InterfaceRef::new("eth5"), InterfaceRef::tagged("eth5", 2))
            .unwrap();
        assert!(check_self_collision(&c).is_err());

        let c = Circuit::local_local("xc", InterfaceRef::tagged("eth5", 1), InterfaceRef::tagged("eth5", 2))
            .unwrap();
        assert!(check_self_collision(&c).is_ok());
    }
}
