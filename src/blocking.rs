//! Snapshot/blocking controller
//!
//! Before a transaction runs the host records a state snapshot and arms the
//! controller with its id. Any serious verdict during the transaction raises
//! the blocking flag; when the transaction has finished the host asks the
//! controller to settle, which reverts the state to the recorded snapshot if
//! the flag is up. Execution itself is never interrupted.

use crate::errors::BlockingError;
use crate::traits::Snapshots;

/// Identifier of a recorded state snapshot
pub type SnapshotId = usize;

/// Outcome of a finished transaction as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub snapshot: SnapshotId,
    pub blocked: bool,
}

impl Settlement {
    /// Revert `state` to the snapshot when blocked, release it otherwise.
    /// Returns whether the state was reverted.
    pub fn apply<S: Snapshots + ?Sized>(self, state: &mut S) -> Result<bool, BlockingError> {
        if self.blocked {
            state.revert_to(self.snapshot)?;
        } else {
            state.release(self.snapshot)?;
        }
        Ok(self.blocked)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockingController {
    snapshot: Option<SnapshotId>,
    blocked: bool,
}

impl BlockingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-transaction snapshot and lower the flag
    pub fn arm(&mut self, snapshot: SnapshotId) {
        self.snapshot = Some(snapshot);
        self.blocked = false;
    }

    /// Raise the flag; true only for the request that raised it
    pub fn request_block(&mut self) -> bool {
        let newly = !self.blocked;
        self.blocked = true;
        newly
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn snapshot(&self) -> Option<SnapshotId> {
        self.snapshot
    }

    /// Close the transaction and hand back the snapshot with the decision
    pub fn finish(&mut self) -> Result<Settlement, BlockingError> {
        let snapshot = self.snapshot.take().ok_or(BlockingError::NotArmed)?;
        Ok(Settlement {
            snapshot,
            blocked: self.blocked,
        })
    }

    /// Finish and apply the decision to `state`
    pub fn settle<S: Snapshots + ?Sized>(&mut self, state: &mut S) -> Result<bool, BlockingError> {
        self.finish()?.apply(state)
    }
}
