use crate::{
    inspectors::SodaInspector,
    monitor::Monitor,
    SodaEvm,
};
use revm::{
    context::Context,
    database::{CacheDB, DatabaseRef, EmptyDB},
    handler::{MainBuilder, MainContext},
};

pub type DefaultEvm<DB> = SodaEvm<CacheDB<DB>, SodaInspector>;
pub type InMemoryEvm = SodaEvm<CacheDB<EmptyDB>, SodaInspector>;

fn create_evm_internal<DB, INSP>(db: CacheDB<DB>, inspector: INSP) -> SodaEvm<CacheDB<DB>, INSP>
where
    DB: DatabaseRef,
{
    let mut ctx = Context::mainnet().with_db(db);
    let cfg = &mut ctx.cfg;
    cfg.disable_eip3607 = true;
    cfg.limit_contract_code_size = None;
    cfg.disable_block_gas_limit = true;
    cfg.disable_base_fee = true;
    let evm = ctx.build_mainnet_with_inspector(inspector);
    SodaEvm::new(evm)
}

/// Create a monitored EVM over `db` with no analyzers registered
///
/// # Example
/// ```rust
/// use revm::database::{CacheDB, EmptyDB};
/// use revm_soda::create_evm;
///
/// let evm = create_evm(CacheDB::new(EmptyDB::default()));
/// assert!(evm.monitor().dispatcher().registry().analyzers().is_empty());
/// ```
pub fn create_evm<DB>(db: CacheDB<DB>) -> DefaultEvm<DB>
where
    DB: DatabaseRef,
{
    create_evm_internal(db, SodaInspector::default())
}

/// Create a monitored EVM over `db` driven by `monitor`
pub fn create_evm_with_monitor<DB>(db: CacheDB<DB>, monitor: Monitor) -> DefaultEvm<DB>
where
    DB: DatabaseRef,
{
    create_evm_internal(db, SodaInspector::new(monitor))
}

/// Create a monitored EVM over an empty in-memory state
pub fn create_in_memory_evm(monitor: Monitor) -> InMemoryEvm {
    create_evm_with_monitor(CacheDB::new(EmptyDB::default()), monitor)
}
