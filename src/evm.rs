//! Monitored EVM wrapper
//!
//! `SodaEvm` wraps revm's `MainnetEvm` the same way a plain tracing wrapper
//! would, and adds the snapshot store the blocking controller reverts to.
//!
//! ## Usage
//!
//! ```rust
//! use revm_soda::{create_in_memory_evm, Monitor, MonitorConfig, TransactionProcessor};
//! use revm_soda::analyzers::ReentrancyAnalyzer;
//! use revm_soda::types::{SimulationBatch, SimulationTx};
//! use alloy::primitives::{address, TxKind, U256};
//!
//! # fn main() -> anyhow::Result<()> {
//! let monitor = Monitor::new(MonitorConfig::default())
//!     .with_analyzer(Box::new(ReentrancyAnalyzer::new()))?;
//! let mut evm = create_in_memory_evm(monitor);
//!
//! let tx = SimulationTx {
//!     caller: address!("C255fC198eEdAC7AF8aF0f6e0ca781794B094A61"),
//!     transact_to: TxKind::Call(address!("d878229c9c3575F224784DE610911B5607a3ad15")),
//!     value: U256::ZERO,
//!     ..Default::default()
//! };
//! let batch = SimulationBatch {
//!     block_params: None,
//!     transactions: vec![tx],
//!     is_stateful: true,
//! };
//!
//! for result in evm.process_transactions(batch) {
//!     let (execution, outcome) = result?;
//!     println!("success: {}, blocked: {}", execution.is_success(), outcome.blocked);
//! }
//! # Ok(())
//! # }
//! ```

use crate::blocking::SnapshotId;
use crate::events::BlockEvent;
use crate::inspectors::SodaInspector;
use crate::monitor::Monitor;
pub use revm::{
    context_interface::ContextTr,
    database::Database,
    handler::MainnetContext,
    inspector::Inspector,
    MainnetEvm,
};
use revm::database::{Cache, CacheDB, DatabaseRef};
use std::ops::{Deref, DerefMut};

pub mod builder;
pub mod inspector;
pub mod processor;
pub mod reset;
pub mod snapshot;

/// Cached state saved by [`crate::traits::Snapshots::snapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    next: SnapshotId,
    entries: Vec<(SnapshotId, Cache)>,
}

impl SnapshotStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// EVM wrapper feeding the monitoring pipeline
///
/// Derefs to the wrapped `MainnetEvm`, so every revm execution API is
/// available directly. Built with [`crate::create_evm`],
/// [`crate::create_evm_with_monitor`] or [`crate::create_in_memory_evm`].
///
/// # Example
/// ```rust
/// use alloy::primitives::{address, U256};
/// use revm::state::AccountInfo;
/// use revm_soda::{create_in_memory_evm, Monitor, Snapshots};
///
/// let mut evm = create_in_memory_evm(Monitor::default());
/// let account = address!("C255fC198eEdAC7AF8aF0f6e0ca781794B094A61");
///
/// let snapshot = evm.snapshot();
/// evm.cache_db().insert_account_info(
///     account,
///     AccountInfo { balance: U256::from(1), ..Default::default() },
/// );
/// evm.revert_to(snapshot).unwrap();
/// assert!(!evm.cache_db().cache.accounts.contains_key(&account));
/// assert!(evm.snapshots().is_empty());
/// ```
pub struct SodaEvm<DB: Database, INSP>(
    MainnetEvm<MainnetContext<DB>, INSP>,
    SnapshotStore,
);

impl<DB, INSP> SodaEvm<DB, INSP>
where
    DB: Database,
{
    pub fn new(evm: MainnetEvm<MainnetContext<DB>, INSP>) -> Self {
        Self(evm, SnapshotStore::default())
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.1
    }
}

impl<DB> SodaEvm<CacheDB<DB>, SodaInspector>
where
    DB: DatabaseRef,
{
    pub fn monitor(&self) -> &Monitor {
        self.0.inspector.monitor()
    }

    pub fn monitor_mut(&mut self) -> &mut Monitor {
        self.0.inspector.monitor_mut()
    }

    /// Announce a new block to the analyzers (`BLOCKINFO`)
    pub fn on_block_start(&mut self, block: BlockEvent) {
        self.0.inspector.monitor_mut().on_block_start(block);
    }
}

impl<DB, INSP> SodaEvm<CacheDB<DB>, INSP>
where
    DB: DatabaseRef,
{
    /// The cache in front of the backing database
    pub fn cache_db(&mut self) -> &mut CacheDB<DB> {
        self.0.ctx.db()
    }
}

impl<DB, INSP> Deref for SodaEvm<DB, INSP>
where
    DB: Database,
{
    type Target = MainnetEvm<MainnetContext<DB>, INSP>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<DB, INSP> DerefMut for SodaEvm<DB, INSP>
where
    DB: Database,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
