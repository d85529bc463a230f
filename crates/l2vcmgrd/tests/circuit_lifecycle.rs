//! End-to-end circuit lifecycle tests
//!
//! Drives the manager through its public API against a recording transport,
//! and once through the shell transport with a stand-in CLI program.

use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

use l2vc_cfgmgr_common::{CfgMgrError, ShellTransport};
use l2vc_cfgmgr_test::endpoint_fixtures::{local, local_sub, remote};
use l2vc_cfgmgr_test::{cli_fixtures, RecordingTransport, StateFixture};
use l2vcmgrd::commands::render_read;
use l2vcmgrd::{
    BatchKind, Circuit, DesiredState, DialectId, InterfaceRef, L2vcMgr, ReconcileState,
    RemotePeer, WriteOp,
};

fn load(fixture: StateFixture) -> DesiredState {
    DesiredState::from_json(&fixture.to_json()).expect("fixture is valid JSON")
}

fn peer(address: &str, vc_id: u32) -> RemotePeer {
    RemotePeer::new(address.parse().unwrap(), vc_id)
}

/// Remote text with peer 10.0.0.5, VC id 100 and untagged eth1/2
#[tokio::test]
async fn test_pseudowire_read_then_create() {
    let text = cli_fixtures::iosxr_pseudowire("pw1", "eth1/2", "10.0.0.5", 100);
    let read_cmd = render_read(DialectId::Iosxr.dialect(), "pw1").remove(0);
    let mut mgr = L2vcMgr::new(
        RecordingTransport::new().with_output(read_cmd, text),
        vec![DialectId::Iosxr],
    );

    let circuit = mgr.read_circuit("pw1").await.unwrap().unwrap();
    assert_eq!(
        circuit,
        Circuit::local_remote("pw1", InterfaceRef::new("eth1/2"), peer("10.0.0.5", 100)).unwrap()
    );

    let after = load(
        StateFixture::new()
            .interface("eth1/2")
            .circuit("pw1", local("eth1/2"), remote("10.0.0.5", 100)),
    );
    let plan = mgr.plan_create("pw1", &after).unwrap();
    assert_eq!(plan[0].kind, BatchKind::Session);
    assert!(plan[0].lines.iter().any(|l| l.contains("10.0.0.5") && l.contains("100")));
    assert_eq!(plan[1].kind, BatchKind::Attachment);
    assert!(plan[1].lines.iter().any(|l| l.contains("eth1/2")));

    mgr.write_circuit("pw1", &after).await.unwrap();
    assert_eq!(mgr.transport().batches().len(), 2);
    assert_eq!(mgr.state(), ReconcileState::Committed);
}

/// Local-local text with eth1 and eth2; delete emits one teardown batch
#[tokio::test]
async fn test_cross_connect_read_then_delete() {
    let text = cli_fixtures::ironware_cross_connect("xc1", "eth1", "eth2");
    let read_cmd = render_read(DialectId::Ironware.dialect(), "xc1").remove(0);
    let mut mgr = L2vcMgr::new(
        RecordingTransport::new().with_output(read_cmd, text),
        vec![DialectId::Iosxr, DialectId::Ironware],
    );

    let circuit = mgr.read_circuit("xc1").await.unwrap().unwrap();
    assert_eq!(
        circuit,
        Circuit::local_local("xc1", InterfaceRef::new("eth1"), InterfaceRef::new("eth2")).unwrap()
    );

    let before = load(
        StateFixture::new()
            .interface("eth1")
            .interface("eth2")
            .circuit("xc1", local("eth1"), local("eth2")),
    );
    let op = mgr.reconcile("xc1", Some(&before), None).await.unwrap();
    assert_eq!(op, WriteOp::Delete);
    assert_eq!(mgr.transport().batches().len(), 1);
}

#[tokio::test]
async fn test_missing_subinterface_issues_no_command() {
    let after = load(
        StateFixture::new()
            .interface("eth3")
            .interface("eth4")
            .circuit("xc2", local_sub("eth3", 20), local("eth4")),
    );
    let mut mgr = L2vcMgr::with_all_dialects(RecordingTransport::new());

    let err = mgr.write_circuit("xc2", &after).await.unwrap_err();
    assert!(matches!(
        err,
        CfgMgrError::MissingSubinterface { subinterface: 20, .. }
    ));
    assert!(mgr.transport().batches().is_empty());
    assert!(mgr.transport().failed_batches().is_empty());
}

#[tokio::test]
async fn test_interface_exclusivity() {
    let base = StateFixture::new()
        .interface("eth0")
        .subinterface("eth0", 5)
        .interface("eth9")
        .circuit("owner", local("eth0"), remote("192.0.2.1", 1));

    for endpoint in [local("eth0"), local_sub("eth0", 5)] {
        let after = load(
            base.clone()
                .circuit("pw9", endpoint, remote("192.0.2.9", 9)),
        );
        let mut mgr = L2vcMgr::with_all_dialects(RecordingTransport::new());
        let err = mgr.write_circuit("pw9", &after).await.unwrap_err();
        assert!(matches!(err, CfgMgrError::InterfaceConflict { .. }));
        assert!(mgr.transport().batches().is_empty());
    }

    let after = load(base.circuit("pw9", local("eth9"), remote("192.0.2.9", 9)));
    let mut mgr = L2vcMgr::with_all_dialects(RecordingTransport::new());
    mgr.write_circuit("pw9", &after).await.unwrap();
}

/// Whatever a dialect writes, the same dialect reads back
#[tokio::test]
async fn test_write_then_read_round_trip() {
    let after = load(
        StateFixture::new()
            .interface("eth1")
            .subinterface("eth2", 40)
            .circuit("pw5", local_sub("eth2", 40), remote("198.51.100.7", 55))
            .circuit("xc5", local("eth1"), local_sub("eth2", 41))
            .subinterface("eth2", 41),
    );

    for id in DialectId::ALL {
        for name in ["pw5", "xc5"] {
            let mut writer = L2vcMgr::new(RecordingTransport::new(), vec![id]);
            if writer.write_circuit(name, &after).await.is_err() {
                // ios has no pseudowire form
                assert_eq!((id, name), (DialectId::Ios, "pw5"));
                continue;
            }

            let text = writer
                .transport()
                .batches()
                .iter()
                .flatten()
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
            let mut reader = RecordingTransport::new();
            for cmd in render_read(id.dialect(), name) {
                reader = reader.with_output(cmd, text.clone());
            }

            let mut mgr = L2vcMgr::new(reader, vec![id]);
            let read = mgr.read_circuit(name).await.unwrap();
            let expected = Circuit::from_config(name, after.circuit(name).unwrap()).unwrap();
            assert_eq!(read, Some(expected), "dialect {}", id);
        }
    }
}

#[tokio::test]
async fn test_shell_transport_reads_device_output() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        cli_fixtures::iosxr_cross_connect("xc7", "eth7", "eth8.70")
    )
    .unwrap();

    // Extra `-c` arguments land on `true`; `cat` prints the canned config.
    let program = format!("cat {} ; true", file.path().display());
    let mut mgr = L2vcMgr::new(ShellTransport::new(program), vec![DialectId::Iosxr]);

    let circuit = mgr.read_circuit("xc7").await.unwrap().unwrap();
    assert_eq!(
        circuit,
        Circuit::local_local("xc7", InterfaceRef::new("eth7"), InterfaceRef::tagged("eth8", 70))
            .unwrap()
    );
}

#[tokio::test]
async fn test_shell_transport_failure_is_reported() {
    let after = load(
        StateFixture::new()
            .interface("eth1")
            .interface("eth2")
            .circuit("xc8", local("eth1"), local("eth2")),
    );
    let mut mgr = L2vcMgr::new(ShellTransport::new("false"), vec![DialectId::Ios]);

    let err = mgr.write_circuit("xc8", &after).await.unwrap_err();
    assert!(err.is_transport_failure());
    assert_eq!(mgr.state(), ReconcileState::Failed);
}
