//! Monitoring inspector
//!
//! `SodaInspector` sits inside the interpreter and turns revm's hooks into
//! monitor callbacks:
//! - `step`/`step_end`: one opcode event per executed instruction whose tag
//!   has subscribers
//! - `call`/`create`: `*START` boundary events for internal frames
//! - `call_end`/`create_end`: `TRANS_*` and `*END` events
//! - `selfdestruct`: `TRANS_SUICIDE`
//!
//! The outermost frame belongs to the external transaction and is reported
//! by the monitor itself through [`SodaInspector::begin_transaction`] and
//! [`SodaInspector::end_transaction`].

mod inspector;
pub mod storage;

use crate::blocking::SnapshotId;
use crate::errors::SodaError;
use crate::events::{
    AccountValue, CallInfo, CreateInfo, ExecutionEvent, GasUsage, InternalOutcome, InvokeKind,
    TransactionEvent,
};
use crate::monitor::{Monitor, TxVerdict};
use crate::traits::Reset;
use crate::utils::error_utils::revert_reason;
use alloy::primitives::{Address, Bytes, U256};
use revm::{
    context::ContextTr,
    database::Database,
    interpreter::InstructionResult,
    primitives::KECCAK_EMPTY,
};
use std::collections::HashMap;
use storage::StorageView;

/// An open frame as seen from the inspector
#[derive(Debug, Clone)]
struct Frame {
    kind: InvokeKind,
    /// Contract executing the frame-opening instruction
    from: Address,
    /// Callee; code address for CALLCODE/DELEGATECALL, zero for a create
    /// frame until its address is known
    address: Address,
    /// Create frames start unbound; every one of them owns a tracker frame
    /// that is rebound once the address is known
    bound: bool,
    value: U256,
    input: Bytes,
    code: Bytes,
    pc: usize,
    args: Vec<U256>,
    gas_limit: u64,
    /// False for the outermost frame; its boundary is reported by the
    /// transaction hooks
    monitored: bool,
}

/// Operands of a frame-opening instruction, consumed by the matching hook
#[derive(Debug, Clone)]
struct PendingCall {
    pc: usize,
    args: Vec<U256>,
}

/// Opcode event waiting for `step_end`
#[derive(Debug, Clone)]
struct PendingStep {
    tag: &'static str,
    event: ExecutionEvent,
    stack_len: usize,
    inputs: usize,
    outputs: usize,
}

#[derive(Default)]
pub struct SodaInspector {
    monitor: Monitor,
    depth: usize,
    frames: Vec<Frame>,
    pending_call: Option<PendingCall>,
    pending_step: Option<PendingStep>,
    pending_write: Option<(Address, U256, U256)>,
    last_pc: usize,
    storage: StorageView,
    /// Runtime code deployed during the running transaction
    deployed: HashMap<Address, Bytes>,
    tx: TransactionEvent,
}

impl SodaInspector {
    pub fn new(monitor: Monitor) -> Self {
        Self {
            monitor,
            ..Default::default()
        }
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut Monitor {
        &mut self.monitor
    }

    /// Start monitoring an external transaction
    pub fn begin_transaction(&mut self, tx: TransactionEvent, snapshot: SnapshotId) {
        self.clear_frames();
        self.tx = tx.clone();
        self.monitor.on_tx_start(tx, snapshot);
    }

    /// Finish the external transaction and collect the monitor's verdict
    ///
    /// `created` is the deployed address of a successful create transaction.
    pub fn end_transaction(
        &mut self,
        success: bool,
        gas_used: u64,
        created: Option<Address>,
    ) -> Result<TxVerdict, SodaError> {
        self.flush_step();
        let mut tx = self.tx.clone();
        tx.success = success;
        tx.gas_used = gas_used;
        if let Some(create) = tx.create.as_mut() {
            create.contract_address = created;
            if let Some(code) = created.and_then(|a| self.deployed.get(&a)) {
                create.runtime_code = code.clone();
            }
        }
        let verdict = self.monitor.on_tx_end(tx);
        self.clear_frames();
        verdict
    }

    fn clear_frames(&mut self) {
        self.depth = 0;
        self.frames.clear();
        self.pending_call = None;
        self.pending_step = None;
        self.pending_write = None;
        self.last_pc = 0;
        self.storage.clear();
        self.deployed.clear();
    }

    /// Dispatch an opcode event whose `step_end` never came
    fn flush_step(&mut self) {
        if let Some(pending) = self.pending_step.take() {
            self.monitor.on_opcode(pending.tag, pending.event);
        }
    }

    /// Code that runs at `address`, including code deployed by this
    /// transaction
    fn code_of<CTX: ContextTr>(&self, context: &mut CTX, address: Address) -> Bytes {
        if let Some(code) = self.deployed.get(&address) {
            return code.clone();
        }
        match context.db().basic(address) {
            Ok(Some(info)) => match info.code {
                Some(code) => code.original_bytes(),
                None if info.code_hash != KECCAK_EMPTY => context
                    .db()
                    .code_by_hash(info.code_hash)
                    .map(|code| code.original_bytes())
                    .unwrap_or_default(),
                None => Bytes::new(),
            },
            _ => Bytes::new(),
        }
    }

    /// Storage value `key` of `address` holds at this point of the
    /// transaction
    fn current_storage<CTX: ContextTr>(&self, context: &mut CTX, address: Address, key: U256) -> U256 {
        self.storage
            .get(address, key)
            .unwrap_or_else(|| context.db().storage(address, key).unwrap_or_default())
    }

    /// `*START` event of a frame
    fn start_event(frame: &Frame) -> ExecutionEvent {
        let mut event = ExecutionEvent::new(frame.kind.start_tag().unwrap_or_default(), frame.pc)
            .with_args(frame.args.iter().copied());
        event.account = AccountValue {
            from: frame.from,
            to: frame.address,
            contract: frame.address,
            value: frame.value,
        };
        event.input = frame.input.clone();
        event.bytecode = frame.code.clone();
        event.gas = GasUsage {
            allocated: frame.gas_limit,
            used: 0,
        };
        event
    }

    /// `*END` event and invocation record of a returning frame
    fn end_records(
        &self,
        frame: &Frame,
        result: InstructionResult,
        output: &Bytes,
        gas_used: u64,
        pushed: U256,
    ) -> (ExecutionEvent, TransactionEvent) {
        let internal = internal_outcome(result, output);

        let mut event = Self::start_event(frame);
        event.op_name = frame.kind.end_tag().unwrap_or_default().to_string();
        event.output = output.clone();
        event.result = Some(pushed.to_string());
        event.gas.used = gas_used;
        event.internal = internal.clone();

        let mut invocation = self.invocation(frame.kind, frame.from, Some(frame.address), frame.value);
        invocation.pc = frame.pc;
        invocation.gas_limit = frame.gas_limit;
        invocation.gas_used = gas_used;
        invocation.success = internal.succeeded;
        if frame.kind.is_create() {
            let deployed = internal.succeeded.then_some(frame.address);
            invocation.to = deployed;
            invocation.create = Some(CreateInfo {
                contract_address: deployed,
                deploy_code: frame.input.clone(),
                runtime_code: if internal.succeeded { output.clone() } else { Bytes::new() },
            });
        } else {
            invocation.call = Some(CallInfo {
                input_data: frame.input.clone(),
                contract_code: frame.code.clone(),
            });
        }
        (event, invocation)
    }

    /// Invocation record carrying the external transaction's identity
    fn invocation(
        &self,
        kind: InvokeKind,
        from: Address,
        to: Option<Address>,
        value: U256,
    ) -> TransactionEvent {
        TransactionEvent {
            tx_hash: self.tx.tx_hash,
            block_number: self.tx.block_number,
            block_time: self.tx.block_time,
            from,
            to,
            value,
            gas_price: self.tx.gas_price,
            nonce: self.tx.nonce,
            kind,
            pc: self.last_pc,
            success: true,
            ..Default::default()
        }
    }
}

impl Reset for SodaInspector {
    /// Drop every in-flight frame and the monitor's transaction state;
    /// registered analyzers are kept
    fn reset(&mut self) {
        self.clear_frames();
        self.tx = TransactionEvent::default();
        self.monitor.reset();
    }
}

/// Outcome triple of a returning frame
fn internal_outcome(result: InstructionResult, output: &Bytes) -> InternalOutcome {
    let succeeded = result.is_ok();
    let valid = !matches!(
        result,
        InstructionResult::CallTooDeep
            | InstructionResult::OutOfFunds
            | InstructionResult::CreateCollision
            | InstructionResult::NonceOverflow
    );
    let error = revert_reason(result, output);
    InternalOutcome {
        error,
        succeeded,
        valid,
    }
}
