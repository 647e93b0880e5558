//! Integration tests for call-stack tracking and the blocking controller
//!
//! # Test Coverage
//! - `depth == layer` across nested enters and exits
//! - Underflow on an unmatched exit
//! - Rebinding create frames
//! - Snapshot arming, block requests and settlement
//! - Report contract column fallbacks

use alloy::primitives::{address, Address};
use revm_soda::blocking::{BlockingController, Settlement, SnapshotId};
use revm_soda::context::{ExecutionContext, TxScope};
use revm_soda::errors::{BlockingError, TrackerError};
use revm_soda::events::tags::{EXTERNALINFOSTART, EXTERNAL_CREATE_MARKER, TXEND};
use revm_soda::tracker::CallStackTracker;
use revm_soda::traits::Snapshots;

const A: Address = address!("00000000000000000000000000000000000000aa");
const B: Address = address!("00000000000000000000000000000000000000bb");

/// Snapshot store over a plain counter
#[derive(Default)]
struct Counter {
    value: u64,
    saved: Vec<(SnapshotId, u64)>,
    next: SnapshotId,
}

impl Snapshots for Counter {
    fn snapshot(&mut self) -> SnapshotId {
        let id = self.next;
        self.next += 1;
        self.saved.push((id, self.value));
        id
    }

    fn revert_to(&mut self, id: SnapshotId) -> Result<(), BlockingError> {
        let pos = self
            .saved
            .iter()
            .position(|(s, _)| *s == id)
            .ok_or(BlockingError::UnknownSnapshot(id))?;
        self.value = self.saved[pos].1;
        self.saved.truncate(pos);
        Ok(())
    }

    fn release(&mut self, id: SnapshotId) -> Result<(), BlockingError> {
        let pos = self
            .saved
            .iter()
            .position(|(s, _)| *s == id)
            .ok_or(BlockingError::UnknownSnapshot(id))?;
        self.saved.remove(pos);
        Ok(())
    }
}

#[test]
fn test_depth_tracks_layer() {
    let mut tracker = CallStackTracker::new();
    assert_eq!(tracker.current_layer(), 0);

    let outer = tracker.enter_call(A);
    let inner = tracker.enter_call(B);
    assert_eq!(outer.layer, 1);
    assert_eq!(inner.layer, 2);
    assert_eq!(tracker.depth(), tracker.current_layer());
    assert_eq!(tracker.current_frame().map(|f| f.address), Some(B));

    assert_eq!(tracker.exit_call().unwrap(), inner);
    assert_eq!(tracker.depth(), 1);
    assert!(tracker.verify().is_ok());
    assert_eq!(tracker.exit_call().unwrap(), outer);
    assert!(tracker.is_empty());
    assert_eq!(tracker.history(), [A, B]);
}

#[test]
fn test_exit_without_enter_underflows() {
    let mut tracker = CallStackTracker::new();
    assert_eq!(tracker.exit_call(), Err(TrackerError::StackUnderflow));
    assert_eq!(tracker.current_layer(), 0);
}

#[test]
fn test_rebind_create_frame() {
    let mut tracker = CallStackTracker::new();
    tracker.enter_call(A);
    tracker.enter_call(Address::ZERO);

    let frame = tracker.rebind_current(B).unwrap();
    assert_eq!(frame.address, B);
    assert_eq!(frame.layer, 2);
    assert_eq!(tracker.history(), [A, B]);

    tracker.reset();
    assert!(tracker.rebind_current(B).is_none());
    assert!(tracker.history().is_empty());
}

#[test]
fn test_blocking_reverts_snapshot() {
    let mut state = Counter::default();
    let mut controller = BlockingController::new();

    let id = state.snapshot();
    controller.arm(id);
    state.value = 42;

    assert!(controller.request_block());
    assert!(!controller.request_block());
    assert!(controller.is_blocked());

    assert_eq!(controller.settle(&mut state), Ok(true));
    assert_eq!(state.value, 0);
    assert!(state.saved.is_empty());
    assert_eq!(controller.snapshot(), None);
}

#[test]
fn test_clean_transaction_keeps_state() {
    let mut state = Counter::default();
    let mut controller = BlockingController::new();

    controller.arm(state.snapshot());
    state.value = 7;

    assert_eq!(controller.settle(&mut state), Ok(false));
    assert_eq!(state.value, 7);
    assert!(state.saved.is_empty());
}

#[test]
fn test_arm_lowers_flag() {
    let mut controller = BlockingController::new();
    controller.arm(0);
    controller.request_block();
    controller.arm(1);
    assert!(!controller.is_blocked());
    assert_eq!(
        controller.finish(),
        Ok(Settlement {
            snapshot: 1,
            blocked: false
        })
    );
    assert_eq!(controller.finish(), Err(BlockingError::NotArmed));
}

#[test]
fn test_unknown_snapshot() {
    let mut state = Counter::default();
    let settlement = Settlement {
        snapshot: 9,
        blocked: true,
    };
    assert_eq!(settlement.apply(&mut state), Err(BlockingError::UnknownSnapshot(9)));
}

#[test]
fn test_report_contract_column() {
    let mut ctx = ExecutionContext::new();
    ctx.reset(TxScope::default(), 0);
    assert_eq!(ctx.current_contract(EXTERNALINFOSTART), EXTERNAL_CREATE_MARKER);
    assert_eq!(ctx.current_contract(TXEND), EXTERNAL_CREATE_MARKER);

    ctx.reset(
        TxScope {
            to: Some(A),
            ..Default::default()
        },
        1,
    );
    assert_eq!(ctx.current_contract(TXEND), format!("{A:#x}"));

    ctx.tracker.enter_call(B);
    assert_eq!(ctx.current_contract(TXEND), format!("{B:#x}"));
}

#[test]
fn test_first_fault_is_latched() {
    let mut ctx = ExecutionContext::new();
    ctx.latch_fault(TrackerError::StackUnderflow);
    ctx.latch_fault(TrackerError::LayerMismatch { depth: 1, layer: 0 });
    assert_eq!(ctx.take_fault(), Some(TrackerError::StackUnderflow));
    assert_eq!(ctx.fault(), None);
}
