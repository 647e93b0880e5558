//! Storage values written during the running transaction
//!
//! Writes are recorded per frame. When a frame fails its writes are rolled
//! back; when it succeeds they become part of the parent frame, so a failing
//! parent still discards them.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

type Slot = (Address, U256);

#[derive(Debug, Clone, Default)]
pub struct StorageView {
    values: HashMap<Slot, U256>,
    /// Per open frame: slot and the value it held before the frame wrote it
    journal: Vec<Vec<(Slot, Option<U256>)>>,
}

impl StorageView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value written to `slot` in this transaction, if any
    pub fn get(&self, address: Address, key: U256) -> Option<U256> {
        self.values.get(&(address, key)).copied()
    }

    pub fn write(&mut self, address: Address, key: U256, value: U256) {
        let slot = (address, key);
        let previous = self.values.insert(slot, value);
        if let Some(frame) = self.journal.last_mut() {
            frame.push((slot, previous));
        }
    }

    pub fn enter(&mut self) {
        self.journal.push(Vec::new());
    }

    /// Close the innermost frame
    pub fn exit(&mut self, succeeded: bool) {
        let Some(entries) = self.journal.pop() else {
            return;
        };
        if succeeded {
            if let Some(parent) = self.journal.last_mut() {
                parent.extend(entries);
            }
            return;
        }
        for (slot, previous) in entries.into_iter().rev() {
            match previous {
                Some(value) => {
                    self.values.insert(slot, value);
                }
                None => {
                    self.values.remove(&slot);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const TOKEN: Address = address!("00000000000000000000000000000000000000aa");

    #[test]
    fn test_failed_frame_rolls_back() {
        let mut view = StorageView::new();
        view.enter();
        view.write(TOKEN, U256::from(1), U256::from(10));

        view.enter();
        view.write(TOKEN, U256::from(1), U256::from(20));
        view.write(TOKEN, U256::from(2), U256::from(30));
        view.exit(false);

        assert_eq!(view.get(TOKEN, U256::from(1)), Some(U256::from(10)));
        assert_eq!(view.get(TOKEN, U256::from(2)), None);
    }

    #[test]
    fn test_parent_failure_discards_child_writes() {
        let mut view = StorageView::new();
        view.enter();
        view.enter();
        view.write(TOKEN, U256::from(1), U256::from(5));
        view.exit(true);
        assert_eq!(view.get(TOKEN, U256::from(1)), Some(U256::from(5)));

        view.exit(false);
        assert_eq!(view.get(TOKEN, U256::from(1)), None);
    }
}
