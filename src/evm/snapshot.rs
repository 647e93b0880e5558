//! State snapshots over `CacheDB`
//!
//! Committed transactions only ever write into the cache layer, so a copy of
//! the cache is a complete snapshot of the simulated state.

use crate::blocking::SnapshotId;
use crate::errors::BlockingError;
use crate::evm::SodaEvm;
use crate::traits::Snapshots;
use revm::{
    context_interface::ContextTr,
    database::{CacheDB, DatabaseRef},
};

impl<DB, INSP> Snapshots for SodaEvm<CacheDB<DB>, INSP>
where
    DB: DatabaseRef,
{
    fn snapshot(&mut self) -> SnapshotId {
        let cache = self.0.ctx.db().cache.clone();
        let id = self.1.next;
        self.1.next += 1;
        self.1.entries.push((id, cache));
        id
    }

    fn revert_to(&mut self, id: SnapshotId) -> Result<(), BlockingError> {
        let position = self
            .1
            .entries
            .iter()
            .position(|(entry, _)| *entry == id)
            .ok_or(BlockingError::UnknownSnapshot(id))?;
        let (_, cache) = self.1.entries.remove(position);
        self.1.entries.truncate(position);
        self.0.ctx.db().cache = cache;
        Ok(())
    }

    fn release(&mut self, id: SnapshotId) -> Result<(), BlockingError> {
        let position = self
            .1
            .entries
            .iter()
            .position(|(entry, _)| *entry == id)
            .ok_or(BlockingError::UnknownSnapshot(id))?;
        self.1.entries.remove(position);
        Ok(())
    }
}
