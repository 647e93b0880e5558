//! Traits at the seams between the monitor, the inspector and the host
//!
//! - `Reset`: clear per-run inspector state
//! - `Snapshots`: state snapshots the blocking controller reverts to
//! - `ResetDB`: clear cached state between independent transactions
//! - `TransactionProcessor`: batch execution entry point

use crate::blocking::SnapshotId;
use crate::errors::{BlockingError, SodaError};
use crate::types::SimulationBatch;
use revm::context_interface::result::ExecutionResult;

/// Trait for resetting inspector state between runs
pub trait Reset {
    fn reset(&mut self);
}

/// State that can be snapshotted and reverted
///
/// Ids are handed out in increasing order. Reverting to an id discards that
/// snapshot and every later one; releasing an id discards it without touching
/// the state.
pub trait Snapshots {
    fn snapshot(&mut self) -> SnapshotId;

    fn revert_to(&mut self, id: SnapshotId) -> Result<(), BlockingError>;

    fn release(&mut self, id: SnapshotId) -> Result<(), BlockingError>;
}

/// Trait for clearing the cached database state
pub trait ResetDB {
    fn reset_db(&mut self);
}

/// Batch transaction processing
pub trait TransactionProcessor {
    type InspectorOutput;

    /// Process a batch of transactions, one result per transaction
    fn process_transactions(
        &mut self,
        batch: SimulationBatch,
    ) -> Vec<Result<(ExecutionResult, Self::InspectorOutput), SodaError>>;
}
