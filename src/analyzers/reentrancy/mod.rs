//! Reentrancy detection
//!
//! Builds the value-carrying call tree of each external transaction from the
//! `CALL`/`CALLCODE` boundary events and, once a transaction has succeeded,
//! reports every call cycle that was passed through repeatedly while moving
//! value. Reports are warnings; the transaction is never blocked by this
//! analyzer.

pub mod tree;

use crate::analyzer::{Analyzer, Registration, Verdict};
use crate::events::tags::{
    CALLCODEEND, CALLCODESTART, CALLEND, CALLSTART, EXTERNALINFOEND, EXTERNALINFOSTART,
};
use crate::events::Event;
use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

pub use tree::{select_victim, CallTree, Cycle, Node, NodeId, Victim};

pub const NAME: &str = "reentrancy";
const HANDLER: &str = "recv";

/// Payload of a reentrancy warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub struct ReentrancyReport {
    pub blocknumber: u64,
    pub txhash: String,
    pub gasused: u64,
    pub cycles: Vec<String>,
    pub victim: String,
    pub totalcyclecount: u64,
    pub totalvaluecount: String,
}

#[derive(Debug, Default)]
pub struct ReentrancyAnalyzer {
    tree: CallTree,
    tx_hash: B256,
    block_number: u64,
    last_report: Option<ReentrancyReport>,
}

impl ReentrancyAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    /// Report produced for the most recent transaction, if any
    pub fn last_report(&self) -> Option<&ReentrancyReport> {
        self.last_report.as_ref()
    }

    fn report(&self, gas_used: u64) -> Option<ReentrancyReport> {
        let cycles = self.tree.detect_cycles();
        if cycles.is_empty() {
            return None;
        }

        // each cycle's victim outflow already covers all of its occurrences
        let mut victim: Option<Victim> = None;
        let mut total = U256::ZERO;
        for cycle in &cycles {
            total = total.saturating_add(cycle.victim.net_outflow);
            if victim.map_or(true, |v| cycle.victim.net_outflow > v.net_outflow) {
                victim = Some(cycle.victim);
            }
        }

        Some(ReentrancyReport {
            blocknumber: self.block_number,
            txhash: format!("{:#x}", self.tx_hash),
            gasused: gas_used,
            cycles: cycles.iter().map(Cycle::chain).collect(),
            victim: victim
                .map(|v| format!("{:#x}", v.address))
                .unwrap_or_default(),
            totalcyclecount: cycles.len() as u64,
            totalvaluecount: total.to_string(),
        })
    }
}

impl Analyzer for ReentrancyAnalyzer {
    fn register(&self) -> Registration {
        [
            EXTERNALINFOSTART,
            EXTERNALINFOEND,
            CALLSTART,
            CALLEND,
            CALLCODESTART,
            CALLCODEEND,
        ]
        .into_iter()
        .fold(Registration::new(NAME), |reg, tag| reg.subscribe(tag, HANDLER))
    }

    fn receive(&mut self, _handler: &str, event: &Event) -> Verdict {
        match event.option.as_str() {
            EXTERNALINFOSTART => {
                if let Some(tx) = event.transaction() {
                    self.tx_hash = tx.tx_hash;
                    self.block_number = tx.block_number;
                    self.last_report = None;
                    self.tree.start(tx.to.unwrap_or(Address::ZERO), tx.value);
                }
            }
            CALLSTART | CALLCODESTART => {
                if let Some(exec) = event.execution() {
                    self.tree.enter(exec.account.to, exec.account.value);
                }
            }
            CALLEND | CALLCODEEND => {
                if let Some(exec) = event.execution() {
                    self.tree
                        .exit(exec.internal.succeeded && exec.internal.valid);
                }
            }
            EXTERNALINFOEND => {
                let Some(tx) = event.transaction() else {
                    return Verdict::clean();
                };
                let report = if tx.success {
                    self.report(tx.gas_used)
                } else {
                    None
                };
                self.tree.clear();

                if let Some(report) = report {
                    let message = match serde_json::to_string(&report) {
                        Ok(json) => json,
                        Err(e) => {
                            log::error!("failed to encode reentrancy report: {}", e);
                            return Verdict::clean();
                        }
                    };
                    self.last_report = Some(report);
                    return Verdict::warning(message);
                }
            }
            _ => {}
        }
        Verdict::clean()
    }
}
