//! # REVM Runtime Security Monitor
//!
//! Runs transactions on revm and streams every executed instruction and
//! call boundary to pluggable analyzers. An analyzer that judges a
//! transaction malicious gets it blocked: the transaction still executes
//! and pays for gas, but its state changes are reverted afterwards.
//!
//! ## Core Features
//!
//! - **Event collection**
//!   - Opcode events with operands, results, gas and storage changes
//!   - Frame boundaries for every call and create kind
//!   - Transaction and block lifecycle events
//!
//! - **Plugin dispatch**
//!   - Subscriptions by literal tag, numbered range (`PUSH8-10`),
//!     suffix wildcard (`PUSH*`), category (`ARITHMETIC`) or `*`
//!   - Warning and serious verdicts written to rotating per-analyzer logs
//!   - Faulty analyzers are contained and logged
//!
//! - **Blocking**
//!   - Snapshot before each transaction, revert after it when blocked
//!
//! - **Bundled analyzers**
//!   - Reentrancy detection over the value-carrying call tree
//!
//! ## Example Usage
//!
//! ```rust
//! use revm_soda::{
//!     create_in_memory_evm, Monitor, MonitorConfig, TransactionProcessor,
//!     analyzer::{Analyzer, Registration, Verdict},
//!     events::Event,
//!     types::{SimulationBatch, SimulationTx},
//! };
//! use alloy::primitives::{address, TxKind, U256};
//!
//! struct CallWatch;
//!
//! impl Analyzer for CallWatch {
//!     fn register(&self) -> Registration {
//!         Registration::new("call-watch").subscribe("CALLSTART", "on_call")
//!     }
//!
//!     fn receive(&mut self, _handler: &str, event: &Event) -> Verdict {
//!         match event.execution() {
//!             Some(call) if call.account.value > U256::ZERO => {
//!                 Verdict::warning(format!("value call to {}", call.account.to))
//!             }
//!             _ => Verdict::clean(),
//!         }
//!     }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let monitor = Monitor::new(MonitorConfig::default()).with_analyzer(Box::new(CallWatch))?;
//! let mut evm = create_in_memory_evm(monitor);
//!
//! let batch = SimulationBatch {
//!     block_params: None,
//!     transactions: vec![SimulationTx {
//!         caller: address!("C255fC198eEdAC7AF8aF0f6e0ca781794B094A61"),
//!         transact_to: TxKind::Call(address!("d878229c9c3575F224784DE610911B5607a3ad15")),
//!         ..Default::default()
//!     }],
//!     is_stateful: true,
//! };
//!
//! for result in evm.process_transactions(batch) {
//!     let (_, outcome) = result?;
//!     for alert in outcome.alerts {
//!         println!("{}: {}", alert.analyzer, alert.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `events`: records handed to analyzers and the tag vocabulary
//! - `tracker`: call-stack bookkeeping
//! - `registry`: tag-spec expansion and subscriptions
//! - `dispatcher`: severity handling and report logs
//! - `monitor`: host lifecycle hooks
//! - `inspectors`: the revm inspector feeding the monitor
//! - `evm`: monitored EVM wrapper and batch processing
//! - `analyzers`: bundled analyzers
//! - `errors`: error types

pub mod analyzer;
pub mod analyzers;
pub mod blocking;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod evm;
pub mod inspectors;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod tracker;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export only the essential types and functions
pub use analyzer::{Analyzer, LegacyAnalyzer, Registration, Severity, Verdict};
pub use config::MonitorConfig;
pub use errors::SodaError;
pub use evm::builder::{create_evm, create_evm_with_monitor, create_in_memory_evm};
pub use evm::SodaEvm;
pub use inspectors::SodaInspector;
pub use monitor::{AdminRequest, Monitor, TxVerdict};
pub use traits::{ResetDB, Snapshots, TransactionProcessor};
pub use types::{SimulationBatch, SimulationTx, TxOutcome};
