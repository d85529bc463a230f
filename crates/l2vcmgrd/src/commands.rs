//! CLI command rendering for circuits
//!
//! Commands are rendered from the dialect's line templates. Each batch is
//! executed by the transport as one unit.

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult};

use crate::dialect::Dialect;
use crate::state::DesiredState;
use crate::tables::placeholders;
use crate::types::{Circuit, CircuitKind, InterfaceRef};

/// Role of a command batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Pseudowire session towards the remote peer
    Session,
    /// Binds one local interface into the circuit
    Attachment,
    /// Binds both cross-connect endpoints at once
    Connect,
    /// Removes the circuit
    Teardown,
}

/// Ordered CLI lines executed as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    pub kind: BatchKind,
    pub lines: Vec<String>,
}

impl CommandBatch {
    pub fn new(kind: BatchKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }

    /// First line, used when logging
    pub fn head(&self) -> &str {
        self.lines.first().map(|l| l.trim()).unwrap_or_default()
    }
}

/// Placeholder values for one render
#[derive(Debug, Default)]
struct Vars<'a> {
    name: &'a str,
    peer: Option<String>,
    vc_id: Option<u32>,
    ifc: Option<&'a InterfaceRef>,
    pair: Option<(&'a InterfaceRef, &'a InterfaceRef)>,
}

fn render_line(template: &str, vars: &Vars<'_>) -> String {
    let mut line = template.replace(placeholders::NAME, vars.name);
    if let Some(peer) = &vars.peer {
        line = line.replace(placeholders::PEER, peer);
    }
    if let Some(vc_id) = vars.vc_id {
        line = line.replace(placeholders::VC_ID, &vc_id.to_string());
    }
    if let Some((first, second)) = vars.pair {
        line = line
            .replace(placeholders::IFC1, &first.to_string())
            .replace(placeholders::IFC2, &second.to_string());
    }
    if let Some(ifc) = vars.ifc {
        line = line.replace(placeholders::IFC, &ifc.name);
        if let Some(vlan) = ifc.subinterface {
            line = line.replace(placeholders::VLAN, &vlan.to_string());
        }
    }
    line
}

fn render(kind: BatchKind, templates: &[&str], vars: &Vars<'_>) -> Option<CommandBatch> {
    if templates.is_empty() {
        return None;
    }
    let lines = templates.iter().map(|t| render_line(t, vars)).collect();
    Some(CommandBatch::new(kind, lines))
}

/// Show commands that fetch circuit `name`
pub fn render_read(dialect: &Dialect, name: &str) -> Vec<String> {
    let vars = Vars {
        name,
        ..Default::default()
    };
    dialect
        .read_commands
        .iter()
        .map(|c| render_line(c, &vars))
        .collect()
}

/// Batches that create `circuit`, without validation against the tree
pub fn render_create(dialect: &Dialect, circuit: &Circuit) -> CfgMgrResult<Vec<CommandBatch>> {
    let kind = circuit.kind();
    if !dialect.supports(kind) {
        return Err(unsupported(circuit));
    }

    let t = &dialect.templates;
    let name = circuit.name();
    let mut batches = Vec::new();

    match kind {
        CircuitKind::LocalRemote => {
            let peer = circuit.remote().ok_or_else(|| unsupported(circuit))?;
            let local = circuit
                .local_endpoints()
                .next()
                .ok_or_else(|| unsupported(circuit))?;
            let vars = Vars {
                name,
                peer: Some(peer.address.to_string()),
                vc_id: Some(peer.vc_id),
                ifc: Some(local),
                pair: None,
            };

            batches.extend(render(BatchKind::Session, t.session, &vars));
            let attach = if local.is_tagged() {
                t.remote_tagged
            } else {
                t.remote_untagged
            };
            batches.extend(render(BatchKind::Attachment, attach, &vars));
        }
        CircuitKind::LocalLocal => {
            let locals: Vec<&InterfaceRef> = circuit.local_endpoints().collect();
            for &local in &locals {
                let vars = Vars {
                    name,
                    ifc: Some(local),
                    ..Default::default()
                };
                let attach = if local.is_tagged() {
                    t.local_tagged
                } else {
                    t.local_untagged
                };
                batches.extend(render(BatchKind::Attachment, attach, &vars));
            }
            if let [first, second] = locals.as_slice() {
                let vars = Vars {
                    name,
                    pair: Some((*first, *second)),
                    ..Default::default()
                };
                batches.extend(render(BatchKind::Connect, t.local_connect, &vars));
            }
        }
    }

    Ok(batches)
}

/// Batches that remove `circuit`
pub fn render_delete(dialect: &Dialect, circuit: &Circuit) -> CfgMgrResult<Vec<CommandBatch>> {
    if !dialect.supports(circuit.kind()) {
        return Err(unsupported(circuit));
    }

    let t = &dialect.templates;
    let vars = Vars {
        name: circuit.name(),
        peer: circuit.remote().map(|p| p.address.to_string()),
        vc_id: circuit.remote().map(|p| p.vc_id),
        ..Default::default()
    };
    let templates = match circuit.kind() {
        CircuitKind::LocalRemote => t.remote_teardown,
        CircuitKind::LocalLocal => t.local_teardown,
    };
    Ok(render(BatchKind::Teardown, templates, &vars).into_iter().collect())
}

/// Validates every local endpoint against the desired tree, then renders
/// the create batches
pub fn plan_create(
    dialect: &Dialect,
    circuit: &Circuit,
    state: &DesiredState,
) -> CfgMgrResult<Vec<CommandBatch>> {
    for local in circuit.local_endpoints() {
        state.check_attachable(local)?;
    }
    render_create(dialect, circuit)
}

/// Delete of the old circuit followed by create of the new one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub teardown: Vec<CommandBatch>,
    pub create: Vec<CommandBatch>,
}

impl UpdatePlan {
    /// All batches in execution order: every teardown before any create
    pub fn batches(&self) -> impl Iterator<Item = &CommandBatch> {
        self.teardown.iter().chain(self.create.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.teardown.is_empty() && self.create.is_empty()
    }
}

fn unsupported(circuit: &Circuit) -> CfgMgrError {
    CfgMgrError::UnsupportedCircuit {
        circuit: circuit.name().to_string(),
        kind: circuit.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectId;
    use crate::parser;
    use crate::types::RemotePeer;
    use pretty_assertions::assert_eq;

    fn pseudowire(local: InterfaceRef) -> Circuit {
        Circuit::local_remote("pw1", local, RemotePeer::new("10.0.0.5".parse().unwrap(), 100))
            .unwrap()
    }

    fn cross_connect(first: InterfaceRef, second: InterfaceRef) -> Circuit {
        Circuit::local_local("xc1", first, second).unwrap()
    }

    fn joined(batches: &[CommandBatch]) -> String {
        batches
            .iter()
            .flat_map(|b| b.lines.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn samples() -> Vec<Circuit> {
        vec![
            pseudowire(InterfaceRef::new("eth1/2")),
            pseudowire(InterfaceRef::tagged("eth1/2", 30)),
            cross_connect(InterfaceRef::new("eth1"), InterfaceRef::new("eth2")),
            cross_connect(InterfaceRef::tagged("eth1", 10), InterfaceRef::new("eth2")),
            cross_connect(InterfaceRef::new("eth1"), InterfaceRef::tagged("eth2", 20)),
        ]
    }

    #[test]
    fn test_round_trip_every_dialect() {
        for id in DialectId::ALL {
            let dialect = id.dialect();
            for circuit in samples() {
                if !dialect.supports(circuit.kind()) {
                    continue;
                }
                let text = joined(&render_create(dialect, &circuit).unwrap());
                let parsed = parser::parse(dialect, circuit.name(), &[text]).unwrap();
                assert_eq!(parsed, circuit, "dialect {}", id);
            }
        }
    }

    #[test]
    fn test_pseudowire_create_order() {
        let batches = render_create(
            DialectId::Iosxr.dialect(),
            &pseudowire(InterfaceRef::new("eth1/2")),
        )
        .unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].kind, BatchKind::Session);
        assert!(batches[0].lines.iter().any(|l| l.contains("10.0.0.5") && l.contains("100")));
        assert_eq!(batches[1].kind, BatchKind::Attachment);
        assert_eq!(batches[1].lines.last().unwrap(), "   interface eth1/2");
    }

    #[test]
    fn test_ironware_tagged_attachment() {
        let batches = render_create(
            DialectId::Ironware.dialect(),
            &pseudowire(InterfaceRef::tagged("ethernet 1/1", 30)),
        )
        .unwrap();
        assert_eq!(
            batches[1].lines,
            vec!["router mpls", " vll pw1 100", "  vlan 30", "   tagged ethernet 1/1"]
        );
    }

    #[test]
    fn test_ios_connect_batch() {
        let circuit = cross_connect(InterfaceRef::new("Gi0/1"), InterfaceRef::tagged("Gi0/2", 20));
        let batches = render_create(DialectId::Ios.dialect(), &circuit).unwrap();
        let kinds: Vec<BatchKind> = batches.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BatchKind::Attachment, BatchKind::Connect]);
        assert_eq!(
            batches[0].lines,
            vec!["interface Gi0/2.20", " encapsulation dot1Q 20"]
        );
        assert_eq!(batches[1].lines, vec!["connect xc1 Gi0/1 Gi0/2.20"]);
    }

    #[test]
    fn test_ios_rejects_pseudowire() {
        let err = render_create(
            DialectId::Ios.dialect(),
            &pseudowire(InterfaceRef::new("Gi0/1")),
        )
        .unwrap_err();
        assert!(matches!(err, CfgMgrError::UnsupportedCircuit { .. }));
    }

    #[test]
    fn test_delete_cross_connect_single_batch() {
        let circuit = cross_connect(InterfaceRef::new("eth1"), InterfaceRef::new("eth2"));
        for id in DialectId::ALL {
            let batches = render_delete(id.dialect(), &circuit).unwrap();
            assert_eq!(batches.len(), 1, "dialect {}", id);
            assert_eq!(batches[0].kind, BatchKind::Teardown);
        }
    }

    #[test]
    fn test_delete_pseudowire_tears_down_session() {
        let batches = render_delete(
            DialectId::Ironware.dialect(),
            &pseudowire(InterfaceRef::new("ethernet 1/1")),
        )
        .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].lines, vec!["router mpls", " no vll pw1 100"]);
    }

    #[test]
    fn test_render_read() {
        assert_eq!(
            render_read(DialectId::Iosxr.dialect(), "pw1"),
            vec!["show running-config l2vpn xconnect group pw1"]
        );
    }

    #[test]
    fn test_plan_create_validates_tree() {
        let circuit = cross_connect(InterfaceRef::new("eth1"), InterfaceRef::tagged("eth3", 20));
        let state = DesiredState::new().with_interface("eth1").with_interface("eth3");

        let err = plan_create(DialectId::Iosxr.dialect(), &circuit, &state).unwrap_err();
        assert!(matches!(
            err,
            CfgMgrError::MissingSubinterface { subinterface: 20, .. }
        ));

        let state = state.with_subinterface("eth3", 20);
        assert_eq!(
            plan_create(DialectId::Iosxr.dialect(), &circuit, &state)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_update_plan_order() {
        let plan = UpdatePlan {
            teardown: vec![CommandBatch::new(BatchKind::Teardown, vec!["no a".into()])],
            create: vec![CommandBatch::new(BatchKind::Session, vec!["a".into()])],
        };
        let heads: Vec<&str> = plan.batches().map(|b| b.head()).collect();
        assert_eq!(heads, vec!["no a", "a"]);
        assert!(!plan.is_empty());
        assert!(UpdatePlan::default().is_empty());
    }
}
