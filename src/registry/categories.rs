//! Macro categories
//!
//! A category token stands for a fixed set of concrete tags. The sets are
//! part of the analyzer-facing contract and never change at runtime.

use crate::events::tags::*;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Named group of concrete tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub token: &'static str,
    pub tags: &'static [&'static str],
}

pub const ARITHMETIC: Category = Category {
    token: "arithmetic-ops",
    tags: &[
        "ADD", "MUL", "SUB", "DIV", "SDIV", "MOD", "SMOD", "ADDMOD", "MULMOD", "EXP",
    ],
};

pub const COMPARISON: Category = Category {
    token: "comparison-ops",
    tags: &["LT", "GT", "SLT", "SGT", "NOT", "EQ", "ISZERO"],
};

pub const CONTROL_FLOW: Category = Category {
    token: "control-flow-ops",
    tags: &["JUMP", "JUMPI"],
};

pub const STORAGE: Category = Category {
    token: "storage-ops",
    tags: &["SLOAD", "SSTORE"],
};

pub const EVENT: Category = Category {
    token: "event-ops",
    tags: &["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"],
};

pub const MEMORY: Category = Category {
    token: "memory-ops",
    tags: &[
        "KECCAK256",
        "CALLDATACOPY",
        "CODECOPY",
        "RETURNDATACOPY",
        "MLOAD",
        "MSTORE",
        "MSTORE8",
        CREATESTART,
        CREATEEND,
        CREATE2START,
        CREATE2END,
        CALLSTART,
        CALLEND,
        CALLCODESTART,
        CALLCODEEND,
        DELEGATECALLSTART,
        DELEGATECALLEND,
        STATICCALLSTART,
        STATICCALLEND,
        "RETURN",
    ],
};

/// Contract bytecode handling: external boundaries and internal creations
pub const BYTECODE: Category = Category {
    token: "bytecode-ops",
    tags: &[EXTERNALINFOSTART, EXTERNALINFOEND, TRANS_CREATE, TRANS_CREATE2],
};

/// Invocation records: external boundaries and internal calls
pub const INVOKE: Category = Category {
    token: "invoke-ops",
    tags: &[
        EXTERNALINFOSTART,
        EXTERNALINFOEND,
        TRANS_CALL,
        TRANS_CALLCODE,
        TRANS_DELEGATECALL,
        TRANS_STATICCALL,
    ],
};

/// Internal invocations that can move ether
pub const ETH: Category = Category {
    token: "eth-ops",
    tags: &[TRANS_CREATE, TRANS_CALL, TRANS_CALLCODE, TRANS_SUICIDE],
};

/// Points where account balances can change
pub const BALANCE: Category = Category {
    token: "balance-ops",
    tags: &[
        EXTERNALINFOSTART,
        EXTERNALINFOEND,
        CALLSTART,
        CALLEND,
        CALLCODESTART,
        CALLCODEEND,
        CREATESTART,
        CREATEEND,
        CREATE2START,
        CREATE2END,
        "SELFDESTRUCT",
    ],
};

pub const ALL: [Category; 10] = [
    ARITHMETIC,
    COMPARISON,
    CONTROL_FLOW,
    STORAGE,
    EVENT,
    MEMORY,
    BYTECODE,
    INVOKE,
    ETH,
    BALANCE,
];

static BY_TOKEN: Lazy<BTreeMap<&'static str, Category>> =
    Lazy::new(|| ALL.iter().map(|c| (c.token, *c)).collect());

pub fn lookup(token: &str) -> Option<Category> {
    BY_TOKEN.get(token).copied()
}
