//! Dispatch tags
//!
//! A tag is either an opcode mnemonic (revm naming) or one of the lifecycle
//! markers below. The set of known tags is what the universal wildcard `*`
//! expands to and what literal registrations are validated against.

use once_cell::sync::Lazy;
use revm::bytecode::opcode::OpCode;
use std::collections::BTreeSet;

pub const TXSTART: &str = "TXSTART";
pub const TXEND: &str = "TXEND";
pub const EXTERNALINFOSTART: &str = "EXTERNALINFOSTART";
pub const EXTERNALINFOEND: &str = "EXTERNALINFOEND";
pub const SUCCESSINFO: &str = "SUCCESSINFO";
pub const FAILINFO: &str = "FAILINFO";
pub const BLOCKINFO: &str = "BLOCKINFO";

pub const CALLSTART: &str = "CALLSTART";
pub const CALLEND: &str = "CALLEND";
pub const CALLCODESTART: &str = "CALLCODESTART";
pub const CALLCODEEND: &str = "CALLCODEEND";
pub const DELEGATECALLSTART: &str = "DELEGATECALLSTART";
pub const DELEGATECALLEND: &str = "DELEGATECALLEND";
pub const STATICCALLSTART: &str = "STATICCALLSTART";
pub const STATICCALLEND: &str = "STATICCALLEND";
pub const CREATESTART: &str = "CREATESTART";
pub const CREATEEND: &str = "CREATEEND";
pub const CREATE2START: &str = "CREATE2START";
pub const CREATE2END: &str = "CREATE2END";

pub const TRANS_CALL: &str = "TRANS_CALL";
pub const TRANS_CALLCODE: &str = "TRANS_CALLCODE";
pub const TRANS_DELEGATECALL: &str = "TRANS_DELEGATECALL";
pub const TRANS_STATICCALL: &str = "TRANS_STATICCALL";
pub const TRANS_CREATE: &str = "TRANS_CREATE";
pub const TRANS_CREATE2: &str = "TRANS_CREATE2";
pub const TRANS_SUICIDE: &str = "TRANS_SUICIDE";

/// Contract marker used in report lines for a create transaction's
/// `EXTERNALINFOSTART`, when no frame has been pushed yet
pub const EXTERNAL_CREATE_MARKER: &str = "EXTERNALCREATE";

/// Opcodes that open a frame; they dispatch as `<NAME>START`/`<NAME>END`
/// instead of under their mnemonic
pub const FRAME_OPCODES: [&str; 6] = [
    "CALL",
    "CALLCODE",
    "DELEGATECALL",
    "STATICCALL",
    "CREATE",
    "CREATE2",
];

const LIFECYCLE_TAGS: [&str; 26] = [
    TXSTART,
    TXEND,
    EXTERNALINFOSTART,
    EXTERNALINFOEND,
    SUCCESSINFO,
    FAILINFO,
    BLOCKINFO,
    CALLSTART,
    CALLEND,
    CALLCODESTART,
    CALLCODEEND,
    DELEGATECALLSTART,
    DELEGATECALLEND,
    STATICCALLSTART,
    STATICCALLEND,
    CREATESTART,
    CREATEEND,
    CREATE2START,
    CREATE2END,
    TRANS_CALL,
    TRANS_CALLCODE,
    TRANS_DELEGATECALL,
    TRANS_STATICCALL,
    TRANS_CREATE,
    TRANS_CREATE2,
    TRANS_SUICIDE,
];

static KNOWN_TAGS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    let mut tags: BTreeSet<&'static str> = (0..=u8::MAX)
        .filter_map(OpCode::new)
        .map(|op| op.as_str())
        .filter(|name| !FRAME_OPCODES.contains(name))
        .collect();
    tags.extend(LIFECYCLE_TAGS);
    tags
});

/// Every concrete tag a subscription may name
pub fn known_tags() -> &'static BTreeSet<&'static str> {
    &KNOWN_TAGS
}

pub fn is_known_tag(tag: &str) -> bool {
    KNOWN_TAGS.contains(tag)
}

/// Tag dispatched under for an executed opcode, `None` for the frame-opening
/// opcodes and bytes that are not valid opcodes
pub fn opcode_tag(opcode: u8) -> Option<&'static str> {
    OpCode::new(opcode)
        .map(|op| op.as_str())
        .filter(|name| !FRAME_OPCODES.contains(name))
}
