//! Transaction-scoped execution context
//!
//! Everything that lives for exactly one external transaction: the call-stack
//! tracker, the identity of the transaction and the blocking controller. It is
//! reset unconditionally when a transaction starts.

use crate::blocking::{BlockingController, SnapshotId};
use crate::errors::TrackerError;
use crate::events::tags::{EXTERNALINFOSTART, EXTERNAL_CREATE_MARKER};
use crate::events::TransactionEvent;
use crate::tracker::CallStackTracker;
use alloy::primitives::{Address, B256};

/// Identity of the transaction being executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxScope {
    pub tx_hash: B256,
    pub block_number: u64,
    pub block_time: u64,
    pub from: Address,
    pub to: Option<Address>,
}

impl From<&TransactionEvent> for TxScope {
    fn from(tx: &TransactionEvent) -> Self {
        Self {
            tx_hash: tx.tx_hash,
            block_number: tx.block_number,
            block_time: tx.block_time,
            from: tx.from,
            to: tx.to,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub tracker: CallStackTracker,
    pub tx: TxScope,
    pub blocking: BlockingController,
    fault: Option<TrackerError>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, tx: TxScope, snapshot: SnapshotId) {
        self.tracker.reset();
        self.tx = tx;
        self.blocking.arm(snapshot);
        self.fault = None;
    }

    /// Contract column of a report line for an event dispatched under `tag`
    pub fn current_contract(&self, tag: &str) -> String {
        match self.tracker.current_frame() {
            Some(frame) => format!("{:#x}", frame.address),
            None if tag == EXTERNALINFOSTART => EXTERNAL_CREATE_MARKER.to_string(),
            None => match self.tx.to {
                Some(to) => format!("{to:#x}"),
                None => EXTERNAL_CREATE_MARKER.to_string(),
            },
        }
    }

    /// Remember the first tracker fault of the transaction
    pub fn latch_fault(&mut self, fault: TrackerError) {
        log::error!("call-stack tracker fault in tx {:#x}: {}", self.tx.tx_hash, fault);
        self.fault.get_or_insert(fault);
    }

    pub fn fault(&self) -> Option<&TrackerError> {
        self.fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<TrackerError> {
        self.fault.take()
    }
}
