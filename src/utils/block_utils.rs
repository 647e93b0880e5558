//! Block environment for simulated batches

use crate::types::BlockEnv;
use alloy::primitives::U256;

/// Block environment with the given number and timestamp
///
/// Difficulty and gas limit keep revm's defaults unless given.
///
/// # Example
/// ```rust
/// use revm_soda::utils::block_utils::create_block_env;
///
/// let block = create_block_env(18_000_000, 1_672_531_200, None, Some(30_000_000));
/// assert_eq!(block.number, 18_000_000);
/// assert_eq!(block.gas_limit, 30_000_000);
/// ```
pub fn create_block_env(
    number: u64,
    timestamp: u64,
    difficulty: Option<u64>,
    gas_limit: Option<u64>,
) -> BlockEnv {
    let mut block = BlockEnv {
        number,
        timestamp,
        ..Default::default()
    };
    if let Some(difficulty) = difficulty {
        block.difficulty = U256::from(difficulty);
    }
    if let Some(gas_limit) = gas_limit {
        block.gas_limit = gas_limit;
    }
    block
}
