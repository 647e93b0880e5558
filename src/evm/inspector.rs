//! Inspector management for SodaEvm

use crate::evm::SodaEvm;
use crate::traits::Reset;
use revm::database::Database;

impl<DB, INSP> SodaEvm<DB, INSP>
where
    DB: Database,
    INSP: Reset,
{
    /// Reset the inspector to its initial state
    ///
    /// Drops every in-flight frame and transaction-scoped record. Called
    /// after each batch and whenever a transaction fails validation.
    pub fn reset_inspector(&mut self) {
        self.0.inspector.reset();
    }

    pub fn get_inspector(&self) -> &INSP {
        &self.0.inspector
    }
}
