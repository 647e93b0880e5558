use crate::{traits::ResetDB, SodaEvm};
use revm::{
    context_interface::ContextTr,
    database::{CacheDB, DatabaseRef},
};

impl<DB, INSP> ResetDB for SodaEvm<CacheDB<DB>, INSP>
where
    DB: DatabaseRef,
{
    /// Clear every cached account, contract, log and block hash
    ///
    /// Subsequent reads go to the backing database again. Outstanding
    /// snapshots are left alone.
    fn reset_db(&mut self) {
        let cached_db = &mut self.0.ctx.db().cache;
        cached_db.accounts.clear();
        cached_db.contracts.clear();
        cached_db.logs = Vec::new();
        cached_db.block_hashes.clear();
    }
}
