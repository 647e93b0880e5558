//! REVM Inspector hooks of the monitoring inspector
//!
//! Frame bookkeeping follows revm's hook order: for a frame-opening
//! instruction `step` and `step_end` run before `call`/`create`, so the
//! operands are stashed in `step` and picked up by the frame hook.

use super::{Frame, PendingCall, PendingStep, SodaInspector};
use crate::events::tags::opcode_tag;
use crate::events::{AccountValue, ExecutionEvent, InvokeKind, StorageChange};
use alloy::primitives::{Address, Log, U256};
use revm::{
    bytecode::opcode::{self, OpCode},
    context::ContextTr,
    interpreter::{
        interpreter_types::{InputsTr, Jumps, LoopControl},
        CallInputs, CallOutcome, CreateInputs, CreateOutcome, Interpreter,
    },
    Inspector,
};

fn opens_frame(op: u8) -> bool {
    matches!(
        op,
        opcode::CALL
            | opcode::CALLCODE
            | opcode::DELEGATECALL
            | opcode::STATICCALL
            | opcode::CREATE
            | opcode::CREATE2
    )
}

impl<CTX: ContextTr> Inspector<CTX> for SodaInspector {
    fn step(&mut self, interp: &mut Interpreter, context: &mut CTX) {
        self.flush_step();

        let op = interp.bytecode.opcode();
        let pc = interp.bytecode.pc();
        self.last_pc = pc;
        let Some(info) = OpCode::new(op) else {
            return;
        };

        // First instruction of a create frame: its address is now known
        let target = interp.input.target_address();
        if let Some(frame) = self.frames.last_mut() {
            if !frame.bound {
                frame.bound = true;
                frame.address = target;
                self.monitor.on_create_address(target);
            }
        }

        let stack = interp.stack.data();
        let inputs = info.inputs() as usize;
        let operands: Vec<U256> = stack.iter().rev().take(inputs).copied().collect();

        if opens_frame(op) {
            self.pending_call = Some(PendingCall { pc, args: operands });
            return;
        }
        if op == opcode::SSTORE && operands.len() == 2 {
            self.pending_write = Some((target, operands[0], operands[1]));
        }

        let Some(tag) = opcode_tag(op) else {
            return;
        };
        if !self.monitor.is_registered(tag) {
            return;
        }

        let (from, value, input, code) = match self.frames.last() {
            Some(frame) => (frame.from, frame.value, frame.input.clone(), frame.code.clone()),
            None => (Address::ZERO, U256::ZERO, Default::default(), Default::default()),
        };
        let stack_len = stack.len();

        let mut event = ExecutionEvent::new(tag, pc).with_args(operands.iter().copied());
        event.account = AccountValue {
            from,
            to: target,
            contract: target,
            value,
        };
        event.input = input;
        event.bytecode = code;
        event.gas.allocated = interp.control.gas().remaining();
        if op == opcode::SSTORE && operands.len() == 2 {
            event.storage = Some(StorageChange {
                previous: self.current_storage(context, target, operands[0]),
                current: operands[1],
            });
        }

        self.pending_step = Some(PendingStep {
            tag,
            event,
            stack_len,
            inputs,
            outputs: info.outputs() as usize,
        });
    }

    fn step_end(&mut self, interp: &mut Interpreter, _context: &mut CTX) {
        if let Some((address, key, value)) = self.pending_write.take() {
            self.storage.write(address, key, value);
        }
        let Some(mut pending) = self.pending_step.take() else {
            return;
        };

        let remaining = interp.control.gas().remaining();
        pending.event.gas.used = pending.event.gas.allocated.saturating_sub(remaining);

        let stack = interp.stack.data();
        let expected = (pending.stack_len + pending.outputs).checked_sub(pending.inputs);
        if pending.outputs > 0 && expected == Some(stack.len()) {
            pending.event.result = stack.last().map(|top| top.to_string());
        }
        self.monitor.on_opcode(pending.tag, pending.event);
    }

    fn log(&mut self, _interp: &mut Interpreter, _context: &mut CTX, log: Log) {
        if let Some(pending) = self.pending_step.as_mut() {
            pending.event.output = log.data.data.clone();
        }
    }

    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        self.flush_step();
        let kind = InvokeKind::from_call_scheme(inputs.scheme);
        let (from, address) = match kind {
            InvokeKind::CallCode | InvokeKind::DelegateCall => {
                (inputs.target_address, inputs.bytecode_address)
            }
            _ => (inputs.caller, inputs.target_address),
        };
        let pending = self.pending_call.take();
        let monitored = self.depth > 0;

        let frame = Frame {
            kind,
            from,
            address,
            bound: true,
            value: inputs.transfer_value().unwrap_or_default(),
            input: inputs.input.bytes(context),
            code: self.code_of(context, inputs.bytecode_address),
            pc: pending.as_ref().map_or(0, |p| p.pc),
            args: pending.map(|p| p.args).unwrap_or_default(),
            gas_limit: inputs.gas_limit,
            monitored,
        };

        self.storage.enter();
        if monitored {
            self.monitor
                .on_call_enter(kind, address, Self::start_event(&frame));
        }
        self.frames.push(frame);
        self.depth += 1;
        None
    }

    fn call_end(&mut self, _context: &mut CTX, _inputs: &CallInputs, outcome: &mut CallOutcome) {
        self.flush_step();
        self.depth = self.depth.saturating_sub(1);
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let result = outcome.result.result;
        self.storage.exit(result.is_ok());

        if frame.monitored {
            let pushed = U256::from(result.is_ok() as u8);
            let (event, invocation) = self.end_records(
                &frame,
                result,
                &outcome.result.output,
                outcome.result.gas.spent(),
                pushed,
            );
            self.monitor.on_call_exit(frame.kind, event, invocation);
        }
    }

    fn create(&mut self, _context: &mut CTX, inputs: &mut CreateInputs) -> Option<CreateOutcome> {
        self.flush_step();
        let kind = InvokeKind::from_create_scheme(inputs.scheme);
        let pending = self.pending_call.take();
        let monitored = self.depth > 0;

        let frame = Frame {
            kind,
            from: inputs.caller,
            address: Address::ZERO,
            bound: false,
            value: inputs.value,
            input: inputs.init_code.clone(),
            code: inputs.init_code.clone(),
            pc: pending.as_ref().map_or(0, |p| p.pc),
            args: pending.map(|p| p.args).unwrap_or_default(),
            gas_limit: inputs.gas_limit,
            monitored,
        };

        self.storage.enter();
        if monitored {
            self.monitor
                .on_call_enter(kind, Address::ZERO, Self::start_event(&frame));
        } else {
            self.monitor.on_external_create();
        }
        self.frames.push(frame);
        self.depth += 1;
        None
    }

    fn create_end(
        &mut self,
        _context: &mut CTX,
        _inputs: &CreateInputs,
        outcome: &mut CreateOutcome,
    ) {
        self.flush_step();
        self.depth = self.depth.saturating_sub(1);
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        let result = outcome.result.result;
        let succeeded = result.is_ok();

        if let Some(address) = outcome.address {
            if !frame.bound {
                frame.bound = true;
                frame.address = address;
                self.monitor.on_create_address(address);
            }
            if succeeded {
                self.deployed.insert(address, outcome.result.output.clone());
            }
        }
        self.storage.exit(succeeded);

        if frame.monitored {
            let pushed = if succeeded {
                U256::from_be_slice(frame.address.as_slice())
            } else {
                U256::ZERO
            };
            let (event, invocation) = self.end_records(
                &frame,
                result,
                &outcome.result.output,
                outcome.result.gas.spent(),
                pushed,
            );
            self.monitor.on_call_exit(frame.kind, event, invocation);
        }
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        let invocation = self.invocation(InvokeKind::SelfDestruct, contract, Some(target), value);
        self.monitor.on_selfdestruct(invocation);
    }
}
