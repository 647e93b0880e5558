//! Helpers shared by the host wrapper and the inspector
//!
//! - [`block_utils`]: block environment construction
//! - [`error_utils`]: revert payload decoding

pub mod block_utils;
pub mod error_utils;
