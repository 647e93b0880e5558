//! Simulation inputs and per-transaction outcomes

pub use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
pub use revm::context::BlockEnv;
use serde::Serialize;

use crate::dispatcher::Alert;

/// Block context applied before a batch runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockParams {
    pub number: u64,
    pub timestamp: u64,
}

/// A transaction to simulate
#[derive(Debug, Clone, Default)]
pub struct SimulationTx {
    pub caller: Address,
    pub value: U256,
    pub data: Bytes,
    pub transact_to: TxKind,
    /// Gas limit; the block gas limit when unset
    pub gas_limit: Option<u64>,
    /// Gas price in wei; zero when unset
    pub gas_price: Option<u128>,
}

/// A batch of transactions sharing one block context
#[derive(Debug, Clone, Default)]
pub struct SimulationBatch {
    pub block_params: Option<BlockParams>,
    pub transactions: Vec<SimulationTx>,
    /// Keep state between transactions of the batch
    pub is_stateful: bool,
}

/// What the monitor made of one executed transaction
#[derive(Debug, Clone, Serialize)]
pub struct TxOutcome {
    pub tx_hash: B256,
    /// State changes were reverted after execution
    pub blocked: bool,
    pub alerts: Vec<Alert>,
}
