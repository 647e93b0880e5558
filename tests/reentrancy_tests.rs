//! Integration tests for reentrancy detection
//!
//! # Test Coverage
//! - Repeated value-carrying cycles and rotation dedupe
//! - Value drained across several re-entries counted once per frame
//! - Plain call chains and single re-entries stay quiet
//! - Failed calls are pruned from the tree
//! - Victim selection by net outflow
//! - End-to-end through the monitor with the JSON warning payload

use alloy::primitives::{address, Address, B256, U256};
use revm_soda::analyzer::Severity;
use revm_soda::analyzers::reentrancy::{select_victim, CallTree, Node, ReentrancyReport, NAME};
use revm_soda::analyzers::ReentrancyAnalyzer;
use revm_soda::events::{ExecutionEvent, InvokeKind, TransactionEvent};
use revm_soda::Monitor;

const A: Address = address!("00000000000000000000000000000000000000aa");
const B: Address = address!("00000000000000000000000000000000000000bb");
const C: Address = address!("00000000000000000000000000000000000000cc");

/// A -> B -> A -> B -> A, with B paying A 10 wei on each re-entry
fn drained_tree() -> CallTree {
    let mut tree = CallTree::new();
    tree.start(A, U256::ZERO);
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::from(10));
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::from(10));
    for _ in 0..4 {
        tree.exit(true);
    }
    tree
}

#[test]
fn test_repeated_cycle_detected_once() {
    let tree = drained_tree();
    let cycles = tree.detect_cycles();

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].path, vec![A, B]);
    assert_eq!(cycles[0].chain(), format!("{A:#x}--{B:#x}"));
    assert_eq!(cycles[0].victim.address, B);
    assert_eq!(cycles[0].victim.net_outflow, U256::from(10));
    assert_eq!(cycles[0].occurrences, 1);
}

/// X -> V -> X -> V -> X -> V -> X, with V paying X 1 wei on every re-entry
fn withdraw_loop() -> CallTree {
    let mut tree = CallTree::new();
    tree.start(C, U256::ZERO);
    for _ in 0..3 {
        tree.enter(A, U256::ZERO);
        tree.enter(C, U256::from(1));
    }
    tree
}

#[test]
fn test_drained_value_counts_every_frame_once() {
    let cycles = withdraw_loop().detect_cycles();

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].path, vec![C, A]);
    assert_eq!(cycles[0].occurrences, 4);
    assert_eq!(cycles[0].victim.address, A);
    assert_eq!(cycles[0].victim.net_outflow, U256::from(3));
}

#[test]
fn test_plain_chain_has_no_cycle() {
    let mut tree = CallTree::new();
    tree.start(A, U256::ZERO);
    tree.enter(B, U256::from(5));
    tree.enter(C, U256::from(5));
    assert!(tree.detect_cycles().is_empty());
}

#[test]
fn test_single_reentry_is_not_repeated() {
    let mut tree = CallTree::new();
    tree.start(A, U256::ZERO);
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::from(10));
    assert!(tree.detect_cycles().is_empty());
}

#[test]
fn test_cycle_without_value_is_ignored() {
    let mut tree = CallTree::new();
    tree.start(A, U256::ZERO);
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::ZERO);
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::ZERO);
    assert!(tree.detect_cycles().is_empty());
}

#[test]
fn test_failed_call_is_pruned() {
    let mut tree = CallTree::new();
    let root = tree.start(A, U256::ZERO);
    let b = tree.enter(B, U256::ZERO).unwrap();
    tree.enter(A, U256::from(10));
    tree.enter(B, U256::ZERO);
    tree.enter(A, U256::from(10));
    tree.exit(true);
    tree.exit(true);
    // the first re-entry into A reverted
    tree.exit(false);

    assert_eq!(tree.current(), Some(b));
    assert!(tree.node(b).children().is_empty());
    assert_eq!(tree.reachable().len(), 2);
    assert!(tree.detect_cycles().is_empty());

    tree.exit(true);
    assert_eq!(tree.current(), Some(root));
    assert_eq!(tree.exit(true), None);
}

#[test]
fn test_enter_before_start_is_ignored() {
    let mut tree = CallTree::new();
    assert_eq!(tree.enter(A, U256::ZERO), None);
    assert!(tree.is_empty());
}

#[test]
fn test_victim_selection() {
    let x = Node::new(A, U256::from(40)).with_outbound(U256::from(100));
    let y = Node::new(B, U256::from(60)).with_outbound(U256::from(60));
    let victim = select_victim([&x, &y]);
    assert_eq!(victim.address, A);
    assert_eq!(victim.net_outflow, U256::from(60));

    // net outflow accumulates per address
    let b1 = Node::new(B, U256::ZERO).with_outbound(U256::from(35));
    let b2 = Node::new(B, U256::ZERO).with_outbound(U256::from(35));
    let victim = select_victim([&x, &b1, &b2]);
    assert_eq!(victim.address, B);
    assert_eq!(victim.net_outflow, U256::from(70));

    // nobody lost value: first participant
    let c = Node::new(C, U256::from(5));
    let victim = select_victim([&c, &y]);
    assert_eq!(victim.address, C);
    assert_eq!(victim.net_outflow, U256::ZERO);
}

fn call(to: Address, value: u64) -> ExecutionEvent {
    let mut event = ExecutionEvent::new("CALL", 0);
    event.account.to = to;
    event.account.contract = to;
    event.account.value = U256::from(value);
    event
}

#[test]
fn test_monitor_reports_reentrancy() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut monitor = Monitor::default()
        .with_analyzer(Box::new(ReentrancyAnalyzer::new()))
        .unwrap();

    let tx = TransactionEvent {
        tx_hash: B256::repeat_byte(0xab),
        block_number: 1_000,
        from: C,
        to: Some(A),
        success: true,
        gas_used: 81_000,
        ..Default::default()
    };
    monitor.on_tx_start(tx.clone(), 0);
    for (to, value) in [(B, 0), (A, 10), (B, 0), (A, 10)] {
        monitor.on_call_enter(InvokeKind::Call, to, call(to, value));
    }
    for _ in 0..4 {
        monitor.on_call_exit(InvokeKind::Call, call(A, 0), TransactionEvent::default());
    }
    let verdict = monitor.on_tx_end(tx).unwrap();

    assert!(!verdict.blocked());
    assert_eq!(verdict.alerts.len(), 1);
    let alert = &verdict.alerts[0];
    assert_eq!(alert.analyzer, NAME);
    assert_eq!(alert.severity, Severity::Warning);
    assert_eq!(alert.tag, "EXTERNALINFOEND");

    let report: serde_json::Value = serde_json::from_str(&alert.message).unwrap();
    assert_eq!(report["blocknumber"], 1_000);
    assert_eq!(report["txhash"], format!("{:#x}", B256::repeat_byte(0xab)));
    assert_eq!(report["gasused"], 81_000);
    assert_eq!(report["cycles"][0], format!("{A:#x}--{B:#x}"));
    assert_eq!(report["victim"], format!("{B:#x}"));
    assert_eq!(report["totalcyclecount"], 1);
    assert_eq!(report["totalvaluecount"], "10");
}

#[test]
fn test_monitor_reports_total_drained_value() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut monitor = Monitor::default()
        .with_analyzer(Box::new(ReentrancyAnalyzer::new()))
        .unwrap();

    let tx = TransactionEvent {
        to: Some(C),
        success: true,
        ..Default::default()
    };
    monitor.on_tx_start(tx.clone(), 0);
    for _ in 0..3 {
        monitor.on_call_enter(InvokeKind::Call, A, call(A, 0));
        monitor.on_call_enter(InvokeKind::Call, C, call(C, 1));
    }
    for _ in 0..6 {
        monitor.on_call_exit(InvokeKind::Call, call(C, 0), TransactionEvent::default());
    }
    let verdict = monitor.on_tx_end(tx).unwrap();

    assert_eq!(verdict.alerts.len(), 1);
    let report: serde_json::Value = serde_json::from_str(&verdict.alerts[0].message).unwrap();
    assert_eq!(report["victim"], format!("{A:#x}"));
    assert_eq!(report["totalcyclecount"], 1);
    assert_eq!(report["totalvaluecount"], "3");
}

#[test]
fn test_failed_transaction_is_not_reported() {
    let mut analyzer_monitor = Monitor::default()
        .with_analyzer(Box::new(ReentrancyAnalyzer::new()))
        .unwrap();
    let mut tx = TransactionEvent {
        to: Some(A),
        ..Default::default()
    };
    analyzer_monitor.on_tx_start(tx.clone(), 0);
    for (to, value) in [(B, 0), (A, 10), (B, 0), (A, 10)] {
        analyzer_monitor.on_call_enter(InvokeKind::Call, to, call(to, value));
    }
    for _ in 0..4 {
        analyzer_monitor.on_call_exit(InvokeKind::Call, call(A, 0), TransactionEvent::default());
    }
    tx.success = false;
    let verdict = analyzer_monitor.on_tx_end(tx).unwrap();
    assert!(verdict.alerts.is_empty());
}

#[test]
fn test_report_field_names() {
    let report = ReentrancyReport {
        blocknumber: 1,
        txhash: "0x01".into(),
        gasused: 2,
        cycles: vec!["0xa--0xb".into()],
        victim: "0xb".into(),
        totalcyclecount: 1,
        totalvaluecount: "3".into(),
    };
    let json = serde_json::to_value(&report).unwrap();
    let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "blocknumber",
            "cycles",
            "gasused",
            "totalcyclecount",
            "totalvaluecount",
            "txhash",
            "victim"
        ]
    );
}
