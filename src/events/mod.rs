//! Event model handed to analyzers
//!
//! Three record kinds travel through the pipeline:
//! - [`ExecutionEvent`]: one opcode or one internal frame boundary
//! - [`TransactionEvent`]: an external transaction boundary, or an internal
//!   invocation (`TRANS_*` tags)
//! - [`BlockEvent`]: one processed block header
//!
//! Every dispatched record is wrapped in an [`Event`] whose `option` is the
//! concrete tag it was dispatched under. Records are built by the host hooks,
//! annotated with the call layer by the monitor and are read-only once handed
//! to an analyzer.

pub mod tags;

use alloy::primitives::{Address, Bloom, Bytes, B256, U256};
use revm::interpreter::{CallScheme, CreateScheme};
use serde::Serialize;

/// Envelope dispatched to every subscriber of a tag
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Concrete tag this event was dispatched under
    pub option: String,
    pub payload: Payload,
}

impl Event {
    pub fn execution(&self) -> Option<&ExecutionEvent> {
        match &self.payload {
            Payload::Execution(event) => Some(event),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&TransactionEvent> {
        match &self.payload {
            Payload::Transaction(event) => Some(event),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<&BlockEvent> {
        match &self.payload {
            Payload::Block(event) => Some(event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum Payload {
    Execution(ExecutionEvent),
    Transaction(TransactionEvent),
    Block(BlockEvent),
}

impl From<ExecutionEvent> for Payload {
    fn from(event: ExecutionEvent) -> Self {
        Payload::Execution(event)
    }
}

impl From<TransactionEvent> for Payload {
    fn from(event: TransactionEvent) -> Self {
        Payload::Transaction(event)
    }
}

impl From<BlockEvent> for Payload {
    fn from(event: BlockEvent) -> Self {
        Payload::Block(event)
    }
}

/// Value movement observed at an instruction or frame boundary
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountValue {
    /// Caller of the executing frame; the invoking contract on boundaries
    pub from: Address,
    /// Executing contract; the callee (code address for
    /// CALLCODE/DELEGATECALL) on boundaries
    pub to: Address,
    /// Contract the event is about
    pub contract: Address,
    pub value: U256,
}

/// Storage slot before and after a storage write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageChange {
    pub previous: U256,
    pub current: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GasUsage {
    /// Gas available when the instruction started
    pub allocated: u64,
    /// Gas actually consumed
    pub used: u64,
}

/// Outcome of an internal call, meaningful on `*END` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalOutcome {
    /// Revert reason or halt kind, empty on success
    pub error: String,
    pub succeeded: bool,
    /// False when the call was rejected before entering the callee
    pub valid: bool,
}

impl Default for InternalOutcome {
    fn default() -> Self {
        Self {
            error: String::new(),
            succeeded: true,
            valid: true,
        }
    }
}

/// Observable effects of one instruction or one frame boundary
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionEvent {
    pub op_name: String,
    pub pc: usize,
    /// Annotated by the monitor from the call-stack tracker
    pub call_layer: usize,
    pub account: AccountValue,
    /// Stack operands as decimal strings, top of stack first
    pub args: Vec<String>,
    /// Call input or init code
    pub input: Bytes,
    /// Return data, or log data for `LOGn`
    pub output: Bytes,
    /// Value pushed by the instruction, as a decimal string
    pub result: Option<String>,
    pub bytecode: Bytes,
    /// Only set for `SSTORE`
    pub storage: Option<StorageChange>,
    pub gas: GasUsage,
    pub internal: InternalOutcome,
}

impl ExecutionEvent {
    pub fn new(op_name: impl Into<String>, pc: usize) -> Self {
        Self {
            op_name: op_name.into(),
            pc,
            ..Default::default()
        }
    }

    pub fn push_arg(&mut self, value: U256) {
        self.args.push(value.to_string());
    }

    pub fn with_args<I: IntoIterator<Item = U256>>(mut self, args: I) -> Self {
        self.args.extend(args.into_iter().map(|v| v.to_string()));
        self
    }
}

/// Kind of an external transaction or an internal invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvokeKind {
    #[default]
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    SelfDestruct,
}

impl InvokeKind {
    pub fn from_call_scheme(scheme: CallScheme) -> Self {
        match scheme {
            CallScheme::CallCode => InvokeKind::CallCode,
            CallScheme::DelegateCall => InvokeKind::DelegateCall,
            CallScheme::StaticCall => InvokeKind::StaticCall,
            _ => InvokeKind::Call,
        }
    }

    pub fn from_create_scheme(scheme: CreateScheme) -> Self {
        match scheme {
            CreateScheme::Create2 { .. } => InvokeKind::Create2,
            _ => InvokeKind::Create,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, InvokeKind::Create | InvokeKind::Create2)
    }

    /// Boundary tag dispatched when the frame is entered; self-destructs open
    /// no frame
    pub fn start_tag(&self) -> Option<&'static str> {
        match self {
            InvokeKind::Call => Some(tags::CALLSTART),
            InvokeKind::CallCode => Some(tags::CALLCODESTART),
            InvokeKind::DelegateCall => Some(tags::DELEGATECALLSTART),
            InvokeKind::StaticCall => Some(tags::STATICCALLSTART),
            InvokeKind::Create => Some(tags::CREATESTART),
            InvokeKind::Create2 => Some(tags::CREATE2START),
            InvokeKind::SelfDestruct => None,
        }
    }

    /// Boundary tag dispatched when the frame returns
    pub fn end_tag(&self) -> Option<&'static str> {
        match self {
            InvokeKind::Call => Some(tags::CALLEND),
            InvokeKind::CallCode => Some(tags::CALLCODEEND),
            InvokeKind::DelegateCall => Some(tags::DELEGATECALLEND),
            InvokeKind::StaticCall => Some(tags::STATICCALLEND),
            InvokeKind::Create => Some(tags::CREATEEND),
            InvokeKind::Create2 => Some(tags::CREATE2END),
            InvokeKind::SelfDestruct => None,
        }
    }

    /// Internal-invocation tag
    pub fn trans_tag(&self) -> &'static str {
        match self {
            InvokeKind::Call => tags::TRANS_CALL,
            InvokeKind::CallCode => tags::TRANS_CALLCODE,
            InvokeKind::DelegateCall => tags::TRANS_DELEGATECALL,
            InvokeKind::StaticCall => tags::TRANS_STATICCALL,
            InvokeKind::Create => tags::TRANS_CREATE,
            InvokeKind::Create2 => tags::TRANS_CREATE2,
            InvokeKind::SelfDestruct => tags::TRANS_SUICIDE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateInfo {
    /// Known once the constructor returned successfully
    pub contract_address: Option<Address>,
    pub deploy_code: Bytes,
    pub runtime_code: Bytes,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CallInfo {
    pub input_data: Bytes,
    pub contract_code: Bytes,
}

/// External transaction boundary or internal invocation record
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionEvent {
    pub tx_hash: B256,
    pub block_number: u64,
    pub block_time: u64,
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// Only known on the end record
    pub gas_used: u64,
    pub nonce: u64,
    pub kind: InvokeKind,
    pub call_layer: usize,
    /// Program counter of the invoking instruction for internal invocations
    pub pc: usize,
    pub create: Option<CreateInfo>,
    pub call: Option<CallInfo>,
    pub success: bool,
}

/// Header fields of one processed block
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockEvent {
    pub parent_hash: B256,
    pub uncle_hash: B256,
    pub coinbase: Address,
    pub state_root: B256,
    pub tx_root: B256,
    pub receipt_root: B256,
    pub bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_digest: B256,
    pub nonce: u64,
}
