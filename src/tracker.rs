//! Call-stack tracking
//!
//! The tracker records the current nesting depth ("layer"), the stack of
//! entered frames and a flat history of every contract address entered during
//! the current external transaction. Every event is annotated from it before
//! dispatch, so the invariant `depth == layer` must hold after every
//! `enter_call`/`exit_call`.

use crate::errors::TrackerError;
use alloy::primitives::Address;
use serde::Serialize;

/// One entered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallFrame {
    pub address: Address,
    pub layer: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CallStackTracker {
    layer: usize,
    frames: Vec<CallFrame>,
    history: Vec<Address>,
}

impl CallStackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a frame at `address`; returns the new frame
    pub fn enter_call(&mut self, address: Address) -> CallFrame {
        self.layer += 1;
        let frame = CallFrame {
            address,
            layer: self.layer,
        };
        self.frames.push(frame);
        self.history.push(address);
        frame
    }

    /// Leave the innermost frame
    ///
    /// Popping an empty stack means the host and the tracker are out of sync.
    pub fn exit_call(&mut self) -> Result<CallFrame, TrackerError> {
        let frame = self.frames.pop().ok_or(TrackerError::StackUnderflow)?;
        if frame.layer != self.layer {
            return Err(TrackerError::LayerMismatch {
                depth: self.frames.len() + 1,
                layer: self.layer,
            });
        }
        self.layer -= 1;
        Ok(frame)
    }

    /// Replace the address of the innermost frame
    ///
    /// A create frame is entered before its address is known; the host
    /// rebinds it once the constructor starts running. The history keeps the
    /// entry order, so the last recorded address is replaced as well.
    pub fn rebind_current(&mut self, address: Address) -> Option<CallFrame> {
        let frame = self.frames.last_mut()?;
        let previous = frame.address;
        frame.address = address;
        if let Some(last) = self.history.iter_mut().rev().find(|a| **a == previous) {
            *last = address;
        }
        Some(*frame)
    }

    pub fn current_layer(&self) -> usize {
        self.layer
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Every address entered since the last reset, in entry order
    pub fn history(&self) -> &[Address] {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check `depth == layer`
    pub fn verify(&self) -> Result<(), TrackerError> {
        if self.frames.len() != self.layer {
            return Err(TrackerError::LayerMismatch {
                depth: self.frames.len(),
                layer: self.layer,
            });
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.layer = 0;
        self.frames.clear();
        self.history.clear();
    }
}
