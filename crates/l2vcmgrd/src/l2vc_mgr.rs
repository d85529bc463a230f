//! L2vcMgr - circuit reconciliation driver

use std::fmt;
use tracing::{debug, info, instrument, warn};

use l2vc_cfgmgr_common::{CfgMgrError, CfgMgrResult, CliTransport, ShellTransport};

use crate::commands::{self, CommandBatch, UpdatePlan};
use crate::config::L2vcConfig;
use crate::dialect::DialectId;
use crate::parser;
use crate::registry::{self, InterfaceUsage};
use crate::state::{CircuitConfig, DesiredState};
use crate::types::Circuit;

/// Observable position of the driver
///
/// Reads move `Idle -> Reading(d)... -> Resolved | Absent`; writes move
/// `Idle -> Validating -> Generating -> Committed | Rejected`. A write whose
/// transport fails part way ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Idle,
    Reading(DialectId),
    Resolved,
    Absent,
    Validating,
    Generating,
    Committed,
    Rejected,
    Failed,
}

impl ReconcileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Idle => "idle",
            ReconcileState::Reading(_) => "reading",
            ReconcileState::Resolved => "resolved",
            ReconcileState::Absent => "absent",
            ReconcileState::Validating => "validating",
            ReconcileState::Generating => "generating",
            ReconcileState::Committed => "committed",
            ReconcileState::Rejected => "rejected",
            ReconcileState::Failed => "failed",
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileState::Reading(id) => write!(f, "reading({})", id),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Write chosen by [`L2vcMgr::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
    Noop,
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOp::Create => "create",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
            WriteOp::Noop => "noop",
        }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconcile decision and the batches it would run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub op: WriteOp,
    pub commands: UpdatePlan,
}

impl WritePlan {
    fn noop() -> Self {
        Self {
            op: WriteOp::Noop,
            commands: UpdatePlan::default(),
        }
    }
}

/// L2vcMgr reads and writes L2 circuits over a device CLI
///
/// Write flow:
/// 1. Build the circuit from the desired tree (shape checks)
/// 2. Check interface exclusivity against sibling circuits
/// 3. Pick the first configured dialect supporting the circuit kind
/// 4. Confirm each local interface exists and carries no address
/// 5. Run the rendered batches in order, stopping at the first failure
pub struct L2vcMgr<T: CliTransport> {
    transport: T,

    /// Read order; the first dialect supporting a circuit kind writes it
    dialects: Vec<DialectId>,

    state: ReconcileState,
}

impl L2vcMgr<ShellTransport> {
    /// Creates a manager driving the configured CLI program
    pub fn from_config(config: &L2vcConfig) -> Self {
        Self::new(
            ShellTransport::new(config.device.cli_program.clone()),
            config.device.dialects.clone(),
        )
    }
}

impl<T: CliTransport> L2vcMgr<T> {
    pub fn new(transport: T, dialects: Vec<DialectId>) -> Self {
        Self {
            transport,
            dialects,
            state: ReconcileState::Idle,
        }
    }

    /// Manager trying every known dialect
    pub fn with_all_dialects(transport: T) -> Self {
        Self::new(transport, DialectId::ALL.to_vec())
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub fn dialects(&self) -> &[DialectId] {
        &self.dialects
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn transition(&mut self, next: ReconcileState) {
        debug!("State {} -> {}", self.state, next);
        self.state = next;
    }

    /// Moves to `Rejected` if `result` is an error
    fn check<V>(&mut self, result: CfgMgrResult<V>) -> CfgMgrResult<V> {
        if let Err(e) = &result {
            warn!("Rejected: {}", e);
            self.transition(ReconcileState::Rejected);
        }
        result
    }

    /// Reads circuit `name` from the device
    ///
    /// Each configured dialect is tried in order; the first one that parses a
    /// complete circuit wins. Returns `None` if no dialect recognises it.
    /// Transport failures are returned as errors.
    #[instrument(skip(self))]
    pub async fn read_circuit(&mut self, name: &str) -> CfgMgrResult<Option<Circuit>> {
        for id in self.dialects.clone() {
            self.transition(ReconcileState::Reading(id));
            let dialect = id.dialect();

            let mut outputs = Vec::new();
            for command in commands::render_read(dialect, name) {
                match self.transport.read(&command).await {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        self.transition(ReconcileState::Failed);
                        return Err(e);
                    }
                }
            }

            match parser::parse(dialect, name, &outputs) {
                Ok(circuit) => {
                    info!("Read circuit {} via {}", circuit, id);
                    self.transition(ReconcileState::Resolved);
                    return Ok(Some(circuit));
                }
                Err(CfgMgrError::ParseMismatch { reason, .. }) => {
                    debug!("Dialect {} did not match: {}", id, reason);
                }
                Err(e) => {
                    self.transition(ReconcileState::Failed);
                    return Err(e);
                }
            }
        }

        info!("Circuit {} not present on device", name);
        self.transition(ReconcileState::Absent);
        Ok(None)
    }

    fn select_dialect(&self, circuit: &Circuit) -> CfgMgrResult<DialectId> {
        self.dialects
            .iter()
            .copied()
            .find(|id| id.dialect().supports(circuit.kind()))
            .ok_or_else(|| CfgMgrError::UnsupportedCircuit {
                circuit: circuit.name().to_string(),
                kind: circuit.kind().to_string(),
            })
    }

    /// Shape, exclusivity, dialect and attachability checks, then rendering
    fn build_create(&mut self, name: &str, after: &DesiredState) -> CfgMgrResult<Vec<CommandBatch>> {
        self.transition(ReconcileState::Validating);
        let circuit = circuit_in(after, name)?;
        let (first, second) = circuit.roles();
        debug!("Validating {} ({} / {})", circuit, first, second);

        registry::check_self_collision(&circuit)?;
        let usage = InterfaceUsage::collect(after, name);
        for local in circuit.local_endpoints() {
            usage.check(name, local)?;
        }
        let id = self.select_dialect(&circuit)?;

        self.transition(ReconcileState::Generating);
        debug!("Rendering create of {} via {}", name, id);
        commands::plan_create(id.dialect(), &circuit, after)
    }

    fn build_delete(&mut self, name: &str, before: &DesiredState) -> CfgMgrResult<Vec<CommandBatch>> {
        self.transition(ReconcileState::Validating);
        let circuit = circuit_in(before, name)?;
        let id = self.select_dialect(&circuit)?;

        self.transition(ReconcileState::Generating);
        debug!("Rendering delete of {} via {}", name, id);
        commands::render_delete(id.dialect(), &circuit)
    }

    fn build_update(
        &mut self,
        name: &str,
        before: &DesiredState,
        after: &DesiredState,
    ) -> CfgMgrResult<UpdatePlan> {
        let teardown = self.build_delete(name, before)?;
        let create = self.build_create(name, after)?;
        Ok(UpdatePlan { teardown, create })
    }

    fn build_reconcile(
        &mut self,
        name: &str,
        before: Option<&DesiredState>,
        after: Option<&DesiredState>,
    ) -> CfgMgrResult<WritePlan> {
        let old = before.and_then(|s| s.circuit(name));
        let new = after.and_then(|s| s.circuit(name));

        match (before, after) {
            (Some(b), Some(a)) if old.is_some() && new.is_some() => {
                if old == new || same_circuit(name, old, new) {
                    return Ok(WritePlan::noop());
                }
                Ok(WritePlan {
                    op: WriteOp::Update,
                    commands: self.build_update(name, b, a)?,
                })
            }
            (_, Some(a)) if new.is_some() => Ok(WritePlan {
                op: WriteOp::Create,
                commands: UpdatePlan {
                    teardown: Vec::new(),
                    create: self.build_create(name, a)?,
                },
            }),
            (Some(b), _) if old.is_some() => Ok(WritePlan {
                op: WriteOp::Delete,
                commands: UpdatePlan {
                    teardown: self.build_delete(name, b)?,
                    create: Vec::new(),
                },
            }),
            _ => Ok(WritePlan::noop()),
        }
    }

    /// Runs `batches` in order, stopping at the first failure
    async fn execute<'a>(
        &mut self,
        batches: impl IntoIterator<Item = &'a CommandBatch>,
    ) -> CfgMgrResult<()> {
        for batch in batches {
            debug!("Running {:?} batch: {}", batch.kind, batch.head());
            if let Err(e) = self.transport.run(&batch.lines).await {
                warn!("Batch '{}' failed: {}", batch.head(), e);
                self.transition(ReconcileState::Failed);
                return Err(e);
            }
        }
        self.transition(ReconcileState::Committed);
        Ok(())
    }

    /// Batches that would create `name`, without running them
    #[instrument(skip(self, after))]
    pub fn plan_create(&mut self, name: &str, after: &DesiredState) -> CfgMgrResult<Vec<CommandBatch>> {
        let result = self.build_create(name, after);
        let batches = self.check(result)?;
        self.transition(ReconcileState::Idle);
        Ok(batches)
    }

    /// Batches that would delete `name`, without running them
    #[instrument(skip(self, before))]
    pub fn plan_delete(&mut self, name: &str, before: &DesiredState) -> CfgMgrResult<Vec<CommandBatch>> {
        let result = self.build_delete(name, before);
        let batches = self.check(result)?;
        self.transition(ReconcileState::Idle);
        Ok(batches)
    }

    /// Batches that would replace `name`, without running them
    #[instrument(skip(self, before, after))]
    pub fn plan_update(
        &mut self,
        name: &str,
        before: &DesiredState,
        after: &DesiredState,
    ) -> CfgMgrResult<UpdatePlan> {
        let result = self.build_update(name, before, after);
        let plan = self.check(result)?;
        self.transition(ReconcileState::Idle);
        Ok(plan)
    }

    /// The write [`reconcile`](Self::reconcile) would perform
    #[instrument(skip(self, before, after))]
    pub fn plan_reconcile(
        &mut self,
        name: &str,
        before: Option<&DesiredState>,
        after: Option<&DesiredState>,
    ) -> CfgMgrResult<WritePlan> {
        let result = self.build_reconcile(name, before, after);
        let plan = self.check(result)?;
        self.transition(ReconcileState::Idle);
        Ok(plan)
    }

    /// Creates circuit `name` as described by `after`
    #[instrument(skip(self, after))]
    pub async fn write_circuit(&mut self, name: &str, after: &DesiredState) -> CfgMgrResult<()> {
        let result = self.build_create(name, after);
        let batches = self.check(result)?;
        self.execute(&batches).await?;
        info!("Created circuit {}", name);
        Ok(())
    }

    /// Removes circuit `name` as described by `before`
    #[instrument(skip(self, before))]
    pub async fn delete_circuit(&mut self, name: &str, before: &DesiredState) -> CfgMgrResult<()> {
        let result = self.build_delete(name, before);
        let batches = self.check(result)?;
        self.execute(&batches).await?;
        info!("Deleted circuit {}", name);
        Ok(())
    }

    /// Replaces circuit `name`: delete of the old form, then create of the new
    ///
    /// Both halves are validated before anything runs. If a delete batch
    /// fails, no create batch is attempted.
    #[instrument(skip(self, before, after))]
    pub async fn update_circuit(
        &mut self,
        name: &str,
        before: &DesiredState,
        after: &DesiredState,
    ) -> CfgMgrResult<()> {
        let result = self.build_update(name, before, after);
        let plan = self.check(result)?;
        self.execute(plan.batches()).await?;
        info!("Updated circuit {}", name);
        Ok(())
    }

    /// Brings the device from `before` to `after` for circuit `name`
    #[instrument(skip(self, before, after))]
    pub async fn reconcile(
        &mut self,
        name: &str,
        before: Option<&DesiredState>,
        after: Option<&DesiredState>,
    ) -> CfgMgrResult<WriteOp> {
        let result = self.build_reconcile(name, before, after);
        let plan = self.check(result)?;

        if plan.op == WriteOp::Noop {
            debug!("Nothing to do for {}", name);
            self.transition(ReconcileState::Idle);
            return Ok(WriteOp::Noop);
        }

        self.execute(plan.commands.batches()).await?;
        info!("Reconciled circuit {} ({})", name, plan.op);
        Ok(plan.op)
    }
}

/// Both configurations build to the same circuit, ignoring endpoint order
fn same_circuit(name: &str, old: Option<&CircuitConfig>, new: Option<&CircuitConfig>) -> bool {
    match (old, new) {
        (Some(old), Some(new)) => matches!(
            (Circuit::from_config(name, old), Circuit::from_config(name, new)),
            (Ok(a), Ok(b)) if a == b
        ),
        _ => false,
    }
}

fn circuit_in(state: &DesiredState, name: &str) -> CfgMgrResult<Circuit> {
    let config = state
        .circuit(name)
        .ok_or_else(|| CfgMgrError::invalid_shape(name, "circuit is not in the desired state"))?;
    Circuit::from_config(name, config)
}
